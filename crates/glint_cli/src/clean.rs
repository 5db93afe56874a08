//! `glint clean` and `glint key`: cache maintenance commands.

use std::path::PathBuf;

use crate::session::Session;
use crate::{GlobalArgs, ProjectArgs};

fn project_dir(args: &ProjectArgs) -> PathBuf {
    args.dir.clone().unwrap_or_else(|| PathBuf::from("."))
}

/// Runs the `glint clean` command.
pub fn run_clean(args: &ProjectArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(&project_dir(args), global)?;
    let mut orchestrator = session.orchestrator()?;
    orchestrator.clear_caches();
    if !global.quiet {
        eprintln!("     Cleaned {}", session.settings.cache.dir.display());
    }
    Ok(0)
}

/// Runs the `glint key` command, printing the library build key to stdout.
pub fn run_key(args: &ProjectArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let session = Session::open(&project_dir(args), global)?;
    let key = session.orchestrator()?.library_key()?;
    println!("{key}");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: None,
        }
    }

    #[test]
    fn clean_removes_library_builds() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join(".glint-cache/lib/9.2.0_O2_480x320_mem256k32m_s2");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("lv_obj.o"), "obj").unwrap();

        let args = ProjectArgs {
            dir: Some(dir.path().to_path_buf()),
        };
        assert_eq!(run_clean(&args, &global()).unwrap(), 0);
        assert!(!stale.exists());
    }

    #[test]
    fn key_fails_on_unsupported_version() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("glint.toml"), "[library]\nversion = \"7.0.0\"\n").unwrap();
        let args = ProjectArgs {
            dir: Some(dir.path().to_path_buf()),
        };
        assert!(run_key(&args, &global()).is_err());
    }
}
