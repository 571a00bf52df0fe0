//! End-to-end pipeline behaviour with a scripted toolchain.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use avrkit_build::{clean, BuildOptions, BuildStage, Builder, ProjectKind};
use avrkit_core::{Invocation, ToolError, ToolOutput, ToolRunner};

const SIZE_OUTPUT: &str = "   text\t   data\t    bss\t    dec\t    hex\tfilename\n   1030\t     12\t    200\t   1242\t    4da\tbuild/blink.elf\n";

/// Pretends to be the AVR toolchain: writes every requested output file
/// unless a scripted response says the run failed.
#[derive(Default)]
struct FakeToolchain {
    calls: Mutex<Vec<Invocation>>,
    /// (argument suffix, response)
    scripted: Vec<(String, ToolOutput)>,
    missing: Vec<String>,
}

impl FakeToolchain {
    fn respond(mut self, arg_suffix: &str, output: ToolOutput) -> Self {
        self.scripted.push((arg_suffix.to_string(), output));
        self
    }

    fn without(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }
}

#[async_trait]
impl ToolRunner for FakeToolchain {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push(invocation.clone());
        if self.missing.contains(&invocation.program) {
            return Err(ToolError::Missing {
                program: invocation.program.clone(),
            });
        }
        if invocation.program == "avr-size" {
            return Ok(ToolOutput::ok(SIZE_OUTPUT));
        }

        let output = self
            .scripted
            .iter()
            .find(|(suffix, _)| invocation.args.iter().any(|a| a.ends_with(suffix.as_str())))
            .map(|(_, out)| out.clone())
            .unwrap_or_else(|| ToolOutput::ok(""));

        if output.success {
            if let Some(out) = invocation.value_of("-o") {
                std::fs::write(out, b"\x7fELF").unwrap();
            }
            if invocation.program == "avr-objcopy" {
                std::fs::write(invocation.args.last().unwrap(), b":00000001FF\n").unwrap();
            }
        }
        Ok(output)
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    hardware: PathBuf,
}

impl Fixture {
    fn framework() -> Self {
        let fixture = Self::empty();
        fixture.write(
            "src/main.cpp",
            "#include <Arduino.h>\n#include \"pins_config.h\"\n\nvoid setup() {\n}\n\nvoid loop() {\n}\n",
        );
        fixture.write(
            "src/pins_config.cpp",
            "#include <Arduino.h>\nvoid pins_init_all(void) {\n}\n",
        );
        fixture
    }

    fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("blink");
        let hardware = dir.path().join("hardware");
        let core = hardware.join("cores/arduino");
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(&core).unwrap();
        std::fs::create_dir_all(hardware.join("variants/standard")).unwrap();
        for name in ["wiring.c", "main.cpp", "HardwareSerial.cpp", "README.md"] {
            std::fs::write(core.join(name), "").unwrap();
        }
        Self {
            _dir: dir,
            root,
            hardware,
        }
    }

    fn write(&self, rel: &str, text: &str) {
        std::fs::write(self.root.join(rel), text).unwrap();
    }

    fn options(&self) -> BuildOptions {
        BuildOptions::new("blink").with_hardware_root(&self.hardware)
    }

    fn build_path(&self, rel: &str) -> String {
        self.root.join("build").join(rel).display().to_string()
    }
}

fn compiled_source(call: &Invocation) -> &str {
    let pos = call.args.iter().position(|a| a == "-o").unwrap();
    &call.args[pos - 1]
}

#[tokio::test]
async fn framework_build_runs_every_stage() {
    let fx = Fixture::framework();
    let builder = Builder::new(FakeToolchain::default(), fx.options());

    let result = builder.build(&fx.root, "uno").await;
    assert!(result.success, "{result}");
    assert_eq!(result.kind, Some(ProjectKind::Framework));
    assert_eq!(result.image, Some(fx.root.join("build/blink.hex")));
    assert_eq!(result.elf, Some(fx.root.join("build/blink.elf")));
    let size = result.size.unwrap();
    assert_eq!(size.flash_bytes, 1042);
    assert_eq!(size.ram_bytes, 212);

    let runner = builder.runner();
    let compiles: Vec<Invocation> = runner
        .calls()
        .into_iter()
        .filter(|c| c.value_of("-o").is_some_and(|o| o.ends_with(".o")))
        .collect();
    let order: Vec<&str> = compiles.iter().map(compiled_source).collect();
    assert!(order[0].ends_with("src/main.cpp"));
    assert!(order[1].ends_with("src/pins_config.cpp"));
    assert!(order[2].ends_with("cores/arduino/HardwareSerial.cpp"));
    assert!(order[3].ends_with("cores/arduino/main.cpp"));
    assert!(order[4].ends_with("cores/arduino/wiring.c"));
    assert_eq!(order.len(), 5);

    let entry = &compiles[0];
    assert!(entry.args.contains(&"-DARDUINO_AVR_UNO".to_string()));
    assert!(entry.args.contains(&"-DARDUINO_ARCH_AVR".to_string()));
    assert!(entry.args.contains(&"-DF_CPU=16000000L".to_string()));

    let link = &runner.calls_to("avr-gcc").into_iter().last().unwrap();
    assert_eq!(link.value_of("-o"), Some(fx.build_path("blink.elf").as_str()));
    assert_eq!(link.args.last().map(String::as_str), Some("-lm"));
    assert!(link.args.contains(&fx.build_path("core/wiring.c.o")));
    assert!(link.args.contains(&fx.build_path("main.cpp.o")));
}

#[tokio::test]
async fn failing_core_file_is_skipped() {
    let fx = Fixture::framework();
    let runner = FakeToolchain::default().respond(
        "wiring.c",
        ToolOutput::failed(1, "wiring.c:12:1: error: 'TCCR0A' was not declared in this scope"),
    );
    let builder = Builder::new(runner, fx.options());

    let result = builder.build(&fx.root, "uno").await;
    assert!(result.success, "{result}");
    assert_eq!(result.skipped.len(), 1);
    assert!(result.skipped[0].path.ends_with("wiring.c"));
    assert!(result.warnings.iter().any(|w| w.contains("skipped core source")));

    let link = builder.runner()
        .calls_to("avr-gcc")
        .into_iter()
        .last()
        .unwrap();
    assert!(!link.args.contains(&fx.build_path("core/wiring.c.o")));
}

#[tokio::test]
async fn primary_failure_aborts_remaining_stages() {
    let fx = Fixture::framework();
    let runner = FakeToolchain::default().respond(
        "src/main.cpp",
        ToolOutput::failed(1, "src/main.cpp:5:3: error: 'pinMod' was not declared in this scope"),
    );
    let builder = Builder::new(runner, fx.options());

    let result = builder.build(&fx.root, "uno").await;
    assert!(!result.success);
    assert_eq!(result.failed_stage, Some(BuildStage::Compile));
    assert!(result.error.as_deref().unwrap().contains("pinMod"));
    assert!(result.stderr.contains("error: 'pinMod'"));
    assert!(result.image.is_none());

    let runner = builder.runner();
    assert_eq!(runner.calls().len(), 1);
    assert!(runner.calls_to("avr-objcopy").is_empty());
}

#[tokio::test]
async fn link_error_is_fatal() {
    let fx = Fixture::framework();
    let runner = FakeToolchain::default().respond(
        "-lm",
        ToolOutput::failed(
            1,
            "main.cpp.o: In function `main':\nmain.cpp:(.text+0x8): undefined reference to `loop'",
        ),
    );
    let builder = Builder::new(runner, fx.options());

    let result = builder.build(&fx.root, "uno").await;
    assert!(!result.success);
    assert_eq!(result.failed_stage, Some(BuildStage::Link));
    assert!(builder.runner().calls_to("avr-objcopy").is_empty());
}

#[tokio::test]
async fn image_extraction_failure_is_fatal() {
    let fx = Fixture::framework();
    let runner = FakeToolchain::default()
        .respond("blink.hex", ToolOutput::failed(1, "avr-objcopy: error: bad elf"));
    let builder = Builder::new(runner, fx.options());

    let result = builder.build(&fx.root, "uno").await;
    assert_eq!(result.failed_stage, Some(BuildStage::Image));
    assert!(result.elf.is_none());
}

#[tokio::test]
async fn bare_register_build_skips_core() {
    let fx = Fixture::empty();
    fx.write(
        "src/main.c",
        "#include <avr/io.h>\n\nint main(void) {\n    DDRB |= _BV(PB5);\n    for (;;) {}\n}\n",
    );
    let builder = Builder::new(FakeToolchain::default(), BuildOptions::new("blink"));

    let result = builder.build(&fx.root, "uno").await;
    assert!(result.success, "{result}");
    assert_eq!(result.kind, Some(ProjectKind::BareRegister));

    let runner = builder.runner();
    let compile = &runner.calls()[0];
    assert_eq!(compile.program, "avr-gcc");
    assert!(!compile.args.iter().any(|a| a.starts_with("-DARDUINO")));
    assert!(!runner
        .calls()
        .iter()
        .any(|c| c.args.iter().any(|a| a.contains("cores/arduino"))));
}

#[tokio::test]
async fn compiler_warnings_do_not_fail() {
    let fx = Fixture::framework();
    let warning = ToolOutput {
        exit_code: Some(0),
        success: true,
        stderr: "src/main.cpp:3:7: warning: unused variable 'x' [-Wunused-variable]\n".into(),
        ..ToolOutput::default()
    };
    let runner = FakeToolchain::default().respond("src/main.cpp", warning);
    let builder = Builder::new(runner, fx.options());

    let result = builder.build(&fx.root, "uno").await;
    assert!(result.success, "{result}");
    assert!(result.warnings.iter().any(|w| w.contains("unused variable")));
}

#[tokio::test]
async fn missing_compiler_is_attributed() {
    let fx = Fixture::framework();
    let builder = Builder::new(FakeToolchain::default().without("avr-g++"), fx.options());

    let result = builder.build(&fx.root, "uno").await;
    assert!(!result.success);
    assert_eq!(result.failed_stage, Some(BuildStage::Compile));
    assert!(result.error.as_deref().unwrap().contains("'avr-g++'"));
}

#[tokio::test]
async fn missing_entry_is_a_classification_error() {
    let fx = Fixture::empty();
    let builder = Builder::new(FakeToolchain::default(), fx.options());

    let result = builder.build(&fx.root, "uno").await;
    assert_eq!(result.failed_stage, Some(BuildStage::Classify));
    assert!(builder.runner().calls().is_empty());
}

#[tokio::test]
async fn framework_build_without_hardware_root_fails_clearly() {
    let fx = Fixture::framework();
    let builder = Builder::new(FakeToolchain::default(), BuildOptions::new("blink"));

    let result = builder.build(&fx.root, "uno").await;
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap().contains("hardware root"));
}

#[tokio::test]
async fn board_table_defaults_are_reported() {
    let fx = Fixture::framework();
    std::fs::write(
        fx.hardware.join("boards.txt"),
        "odd.name=Odd\nodd.build.mcu=pic16f84\n",
    )
    .unwrap();
    let builder = Builder::new(FakeToolchain::default(), fx.options());

    let result = builder.build(&fx.root, "odd").await;
    assert!(result.success, "{result}");
    assert!(result.warnings.iter().any(|w| w.contains("pic16f84")));
    let entry = &builder.runner().calls()[0];
    assert!(entry.args.contains(&"-mmcu=atmega328p".to_string()));
}

#[tokio::test]
async fn result_serializes_for_callers() {
    let fx = Fixture::framework();
    let builder = Builder::new(FakeToolchain::default(), fx.options());
    let result = builder.build(&fx.root, "uno").await;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["kind"], "framework");
}

#[tokio::test]
async fn clean_removes_build_directory() {
    let fx = Fixture::framework();
    let options = fx.options();
    let builder = Builder::new(FakeToolchain::default(), options.clone());
    assert!(builder.build(&fx.root, "uno").await.success);
    assert!(fx.root.join("build").exists());

    assert!(clean(&fx.root, &options).await.unwrap());
    assert!(!fx.root.join("build").exists());
    assert!(!clean(&fx.root, &options).await.unwrap());
}
