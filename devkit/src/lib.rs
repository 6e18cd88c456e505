/*!
# DiskWatch DevKit - stubs and helpers for testing the monitor

In-memory stand-ins for the remote world:
- A scripted disk checker (no SSH needed)
- A recording notifier and a recording mail transport
- A harness that runs sweeps and checks alert expectations
*/

pub mod checker_stub;
pub mod notifier_stub;
pub mod test_utils;

pub use checker_stub::{CheckCall, ScriptedChecker};
pub use notifier_stub::{RecordingMailTransport, RecordingNotifier};
pub use test_utils::TestHarness;
