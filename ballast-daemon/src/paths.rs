use std::path::{Path, PathBuf};

pub const DAEMON_SOCKET: &str = "daemon.sock";

pub fn ballast_dir(home: &Path) -> PathBuf {
    home.join(".ballast")
}

pub fn socket_path(home: &Path) -> PathBuf {
    ballast_dir(home).join(DAEMON_SOCKET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_lives_beside_config() {
        let home = Path::new("/home/u");
        assert_eq!(socket_path(home), PathBuf::from("/home/u/.ballast/daemon.sock"));
        assert_eq!(
            socket_path(home).parent(),
            ballast_core::config::config_path_at(home).parent()
        );
    }
}
