//! `swarmgate check`: report whether the container engine is usable.

use crate::engine::{ContainerEngine, check_engine};

/// Print the engine status and the steps to fix it. Returns `true` when the
/// engine answered.
pub async fn run_check_command(engine: &dyn ContainerEngine) -> bool {
    let detection = check_engine(engine).await;

    println!("Container engine: {}", detection.status.as_str());
    if let Some(detail) = &detection.detail {
        println!("  Error: {}", detail);
    }
    for step in detection.platform.fix_steps(detection.status) {
        println!("  - {}", step);
    }

    detection.status.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubEngine, StubFailure};

    #[tokio::test]
    async fn test_check_reports_availability() {
        let engine = StubEngine::new();
        assert!(run_check_command(&engine).await);

        engine.set_failure(Some(StubFailure::Unavailable));
        assert!(!run_check_command(&engine).await);
    }
}
