//! A stand-in for the `smafa` executable
//!
//! `cluster` reads pseudo-FASTA from the file named by its third argument
//! (`/dev/stdin` in practice) and `makedb <input> <output>` copies its input
//! to the output path. Every invocation is appended to `smafa.calls` next to
//! the script.

use std::fs;
use std::path::{Path, PathBuf};

pub const CALLS_FILE: &str = "smafa.calls";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeSmafaMode {
    /// Each sequence is its own representative
    Identity,
    /// Every sequence joins the cluster of the first one
    MergeAll,
    /// `cluster` prints a line that is not a member/representative pair
    Malformed,
    /// Both subcommands exit non-zero
    Fail,
    /// `cluster` never returns
    Hang,
}

impl FakeSmafaMode {
    fn cluster_body(&self) -> &'static str {
        match self {
            FakeSmafaMode::Identity => r#"grep -v '^>' "$3" | awk 'NF { print $1 "\t" $1 }'"#,
            FakeSmafaMode::MergeAll => {
                r#"grep -v '^>' "$3" | awk 'NF { if (rep == "") rep = $1; print $1 "\t" rep }'"#
            }
            FakeSmafaMode::Malformed => r#"echo "this line has no tab""#,
            FakeSmafaMode::Fail => r#"echo "smafa: simulated failure" >&2; exit 2"#,
            FakeSmafaMode::Hang => "exec sleep 600",
        }
    }

    fn makedb_body(&self) -> &'static str {
        match self {
            FakeSmafaMode::Fail => r#"echo "smafa: simulated makedb failure" >&2; exit 2"#,
            _ => r#"cp "$2" "$3""#,
        }
    }
}

/// Write an executable fake smafa into `dir` and return its path.
#[cfg(unix)]
pub fn write_fake_smafa(dir: &Path, mode: FakeSmafaMode) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("smafa");
    let script = format!(
        "#!/bin/sh\n\
         echo \"$@\" >> \"$(dirname \"$0\")/{calls}\"\n\
         case \"$1\" in\n\
         cluster)\n\
         {cluster}\n\
         ;;\n\
         makedb)\n\
         {makedb}\n\
         ;;\n\
         *)\n\
         echo \"unknown subcommand $1\" >&2; exit 1\n\
         ;;\n\
         esac\n",
        calls = CALLS_FILE,
        cluster = mode.cluster_body(),
        makedb = mode.makedb_body(),
    );
    fs::write(&path, script).expect("write fake smafa");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake smafa");
    path
}

/// Argument lines of every recorded invocation in `dir`
pub fn read_fake_smafa_calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join(CALLS_FILE))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
