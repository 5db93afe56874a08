//! A recording toolchain for stage tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use glint_toolchain::{InvokeError, InvokeOptions, InvokeOutput, Toolchain};

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Call {
    pub fn is_link(&self) -> bool {
        self.args.iter().any(|a| a.ends_with("index.js"))
    }

    pub fn sources(&self) -> Vec<&str> {
        self.args
            .iter()
            .filter(|a| a.ends_with(".c"))
            .map(String::as_str)
            .collect()
    }
}

/// Pretends to be `emcc`: creates the outputs a real run would and records
/// every call.
///
/// With `-o <out>` it creates `<out>` (and the `.wasm` next to a `.js`).
/// With `-c` and no `-o` it creates `<cwd>/<stem>.o` for every `.c` argument.
/// Sources whose path contains a configured failure pattern produce no
/// output, and the call fails with an error diagnostic for them.
#[derive(Default)]
pub struct FakeToolchain {
    calls: Mutex<Vec<Call>>,
    failing: Vec<String>,
    stderr: String,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources containing `pattern` fail to compile.
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.failing.push(pattern.to_string());
        self
    }

    /// Extra stderr text returned by every call.
    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = stderr.to_string();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn fails(&self, source: &str) -> bool {
        self.failing.iter().any(|p| source.contains(p.as_str()))
    }
}

impl Toolchain for FakeToolchain {
    fn invoke(
        &self,
        _program: &Path,
        args: &[String],
        options: &InvokeOptions,
    ) -> Result<InvokeOutput, InvokeError> {
        self.calls.lock().unwrap().push(Call {
            args: args.to_vec(),
            cwd: options.cwd.clone(),
        });

        let mut stderr = self.stderr.clone();
        let failed: Vec<&String> = args
            .iter()
            .filter(|a| a.ends_with(".c") && self.fails(a))
            .collect();
        for source in &failed {
            stderr.push_str(&format!("{source}:1:1: error: simulated failure\n"));
        }

        let out_flag = args.iter().position(|a| a == "-o");
        if let Some(i) = out_flag {
            if failed.is_empty() {
                let out = PathBuf::from(&args[i + 1]);
                std::fs::create_dir_all(out.parent().unwrap()).unwrap();
                std::fs::write(&out, b"fake").unwrap();
                if out.extension().is_some_and(|e| e == "js") {
                    std::fs::write(out.with_extension("wasm"), b"\0asm").unwrap();
                }
            }
        } else if args.iter().any(|a| a == "-c") {
            let cwd = options.cwd.clone().unwrap_or_default();
            for source in args.iter().filter(|a| a.ends_with(".c")) {
                if self.fails(source) {
                    continue;
                }
                let stem = Path::new(source).file_stem().unwrap();
                let mut obj = cwd.join(stem);
                obj.set_extension("o");
                std::fs::write(obj, b"fake").unwrap();
            }
        }

        let output = InvokeOutput {
            stdout: String::new(),
            stderr,
        };
        if failed.is_empty() {
            Ok(output)
        } else {
            Err(InvokeError::Exit {
                program: PathBuf::from("emcc"),
                code: Some(1),
                output,
            })
        }
    }
}
