//! Test harness wiring mock collaborators into a full ServerState.

use server_core::common::ServerState;
use server_core::config::ProvisioningSettings;
use server_core::domains::provisioning::Provisioner;
use server_core::kernel::test_dependencies::TestDependencies;

pub struct TestHarness {
    pub mocks: TestDependencies,
    pub state: ServerState,
}

impl TestHarness {
    pub async fn new(settings: ProvisioningSettings) -> Self {
        Self::with_mocks(TestDependencies::new(), settings).await
    }

    pub async fn with_mocks(mocks: TestDependencies, settings: ProvisioningSettings) -> Self {
        init_tracing();
        let state = ServerState::initialize(mocks.deps(), settings, "test_secret_key")
            .await
            .expect("state init");
        Self { mocks, state }
    }

    pub fn provisioner(&self) -> Provisioner {
        Provisioner::new(self.state.clone())
    }
}

/// Opt-in log output for debugging test runs (RUST_LOG=debug).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
