//! Host account helpers

use crate::exec::{CommandLine, CommandRunner};
use crate::Result;

/// Add `user` to the supplementary group `group`
pub fn add_user_to_group(runner: &dyn CommandRunner, user: &str, group: &str) -> Result<()> {
    log::debug!("Adding user '{}' to group '{}'", user, group);
    runner.run_checked(&CommandLine::new("usermod").args(["-a", "-G", group, user]))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRunner;

    #[test]
    fn test_add_user_to_group() {
        let runner = RecordingRunner::new();
        add_user_to_group(&runner, "www-data", "modoboa").unwrap();
        assert_eq!(runner.commands(), vec!["usermod -a -G modoboa www-data"]);
    }

    #[test]
    fn test_add_user_to_group_failure_is_fatal() {
        let runner = RecordingRunner::failing_on("usermod");
        assert!(add_user_to_group(&runner, "nginx", "uwsgi").is_err());
    }
}
