use hvcc_compile::frontend::Frontend;
use hvcc_compile::generators::{Description, GenArgs, Generator, GeneratorRegistry};
use hvcc_compile::results::{CORE, HVIR, Notifications};
use hvcc_compile::{CompileError, CompileOptions, Compiler};
use hvcc_ir::HVIR_FILE;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::error::Error;
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

type Calls = Rc<RefCell<Vec<(String, GenArgs)>>>;

/// Records the arguments of each run, then returns a copy of `fragment`.
struct Recorder {
    name: &'static str,
    calls: Calls,
    fragment: Notifications,
}

impl Generator for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, args: &GenArgs) -> Result<Notifications, Box<dyn Error>> {
        self.calls.borrow_mut().push((self.name.into(), args.clone()));
        Ok(self.fragment.clone())
    }
}

struct Broken;

impl Generator for Broken {
    fn name(&self) -> &'static str {
        "daisy"
    }

    fn run(&self, _args: &GenArgs) -> Result<Notifications, Box<dyn Error>> {
        Err("libDaisy not found".into())
    }
}

/// What the fake frontend does when it is called.
#[derive(Clone)]
enum Behavior {
    /// Writes `hvir` to the requested out path.
    WriteFile(Value),
    /// Hands `hvir` back in the fragment.
    ReturnTree(Value),
    /// Reports a patch error.
    PatchError(&'static str),
    /// Fails outright.
    Fail,
}

struct FakeFrontend {
    behavior: Behavior,
    requests: Rc<RefCell<Vec<(PathBuf, PathBuf, Vec<PathBuf>)>>>,
}

impl Frontend for FakeFrontend {
    fn generate(
        &self,
        in_path: &Path,
        out_path: &Path,
        search_paths: &[PathBuf],
        _verbose: bool,
    ) -> Result<Notifications, Box<dyn Error>> {
        self.requests.borrow_mut().push((
            in_path.into(),
            out_path.into(),
            search_paths.to_vec(),
        ));
        let mut fragment = Notifications::default();
        match &self.behavior {
            Behavior::WriteFile(hvir) => hvcc_ir::json::dump(out_path, hvir)?,
            Behavior::ReturnTree(hvir) => {
                fragment.warnings.push("object [print] has no effect".into());
                fragment.payload.insert("hvir".into(), hvir.clone());
            }
            Behavior::PatchError(message) => fragment.errors.push((*message).into()),
            Behavior::Fail => return Err("hvcc-frontend: command not found".into()),
        }
        Ok(fragment)
    }
}

struct Harness {
    dir: tempfile::TempDir,
    compiler: Compiler,
    calls: Calls,
    requests: Rc<RefCell<Vec<(PathBuf, PathBuf, Vec<PathBuf>)>>>,
}

impl Harness {
    fn new(behavior: Behavior) -> Harness {
        let calls = Calls::default();
        let requests = Rc::default();
        let mut registry = GeneratorRegistry::default();
        for name in ["native", "description", "dpf", "owl"] {
            registry.register(Recorder {
                name,
                calls: calls.clone(),
                fragment: Notifications::default(),
            });
        }
        let frontend = FakeFrontend {
            behavior,
            requests: Rc::clone(&requests),
        };
        Harness {
            dir: tempfile::tempdir().unwrap(),
            compiler: Compiler::new(Box::new(frontend), registry),
            calls,
            requests,
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn options(&self, in_path: &str, generators: &[&str]) -> CompileOptions {
        CompileOptions {
            in_path: self.path(in_path),
            out_dir: self.path("out"),
            generators: generators.iter().map(|name| name.to_string()).collect(),
            ..Default::default()
        }
    }

    fn called(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(name, _)| name.clone()).collect()
    }
}

fn synth_hvir() -> Value {
    json!({
        "name": "synth",
        "interface": {
            "parameters": {
                "cutoff": {"name": "cutoff", "direction": "in", "min": 20, "max": 20000},
                "level": {"name": "level", "direction": "out"}
            },
            "events": {
                "gate": {"name": "gate", "direction": "in"}
            },
            "io": {"in": 1, "out": 2}
        },
        "tables": {
            "list": {"wave": {"name": "wave", "size": 512}}
        }
    })
}

fn write_hvir(dir: &Path, hvir: &Value) {
    create_dir_all(dir).unwrap();
    hvcc_ir::json::dump(&dir.join(HVIR_FILE), hvir).unwrap();
}

#[test]
fn missing_input() {
    let harness = Harness::new(Behavior::Fail);
    let results = harness
        .compiler
        .compile_dataflow(&harness.options("nowhere.json", &["native"]))
        .unwrap();
    assert_eq!(results.len(), 1);
    let errors = &results.get(CORE).unwrap().errors;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("nowhere.json"));
    assert!(errors[0].ends_with("does not exist"));
    assert!(harness.requests.borrow().is_empty());
    assert!(harness.called().is_empty());
}

#[test]
fn rejects_other_inputs() {
    let harness = Harness::new(Behavior::Fail);
    write(harness.path("patch.pd"), "#N canvas 0 0 450 300 12;").unwrap();
    create_dir_all(harness.path("sources")).unwrap();

    let results = harness
        .compiler
        .compile_dataflow(&harness.options("patch.pd", &["native"]))
        .unwrap();
    assert!(results.get(CORE).unwrap().errors[0].contains("is not a valid hvir or patch file"));

    let results = harness
        .compiler
        .compile_dataflow(&harness.options("sources", &["native"]))
        .unwrap();
    assert!(
        results.get(CORE).unwrap().errors[0].contains("is neither a c_src nor a .hvir directory")
    );
    assert!(harness.called().is_empty());
}

#[test]
fn hvir_directory() {
    let harness = Harness::new(Behavior::Fail);
    write_hvir(&harness.path("synth.hvir"), &synth_hvir());
    let mut options = harness.options("synth.hvir", &["owl", "native"]);
    options.patch_name = Some("synth".into());
    options.copyright = Some("Copyright 2026 Example".into());

    let results = harness.compiler.compile_dataflow(&options).unwrap();
    assert!(!results.has_errors());
    assert!(harness.requests.borrow().is_empty());
    assert_eq!(harness.called(), ["native", "owl"]);
    assert!(results.get("native").is_some());
    assert!(results.get("owl").is_some());
    assert!(results.get("dpf").is_none());

    let calls = harness.calls.borrow();
    let args = &calls[0].1;
    assert_eq!(args.c_src_dir, harness.path("synth.hvir/c_src"));
    assert_eq!(args.out_dir, harness.path("out"));
    assert_eq!(args.patch_name, "synth");
    assert_eq!(args.patch_meta, json!({}));
    assert_eq!(args.num_input_channels, 1);
    assert_eq!(args.num_output_channels, 2);
    assert_eq!(args.copyright.as_deref(), Some("Copyright 2026 Example"));
    assert_eq!(args.externs.stats.num_parameters, 1);
    assert_eq!(args.externs.stats.num_events, 1);
    assert_eq!(args.externs.parameters.inputs[0].0, "cutoff");
    assert_eq!(args.externs.parameters.outputs[0].0, "level");
    assert_eq!(args.externs.tables[0].0, "wave");
}

#[test]
fn c_src_directory() {
    let harness = Harness::new(Behavior::Fail);
    write_hvir(&harness.path("synth.hvir"), &synth_hvir());
    create_dir_all(harness.path("synth.hvir/c_src")).unwrap();

    let results = harness
        .compiler
        .compile_dataflow(&harness.options("synth.hvir/c_src", &["dpf"]))
        .unwrap();
    assert!(!results.has_errors());
    let calls = harness.calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.c_src_dir, harness.path("synth.hvir/c_src"));
    assert_eq!(calls[0].1.patch_name, "Untitled");
    assert_eq!(calls[0].1.num_output_channels, 2);
}

#[test]
fn missing_hvir_file() {
    let harness = Harness::new(Behavior::Fail);
    create_dir_all(harness.path("empty.hvir")).unwrap();
    let results = harness
        .compiler
        .compile_dataflow(&harness.options("empty.hvir", &["native"]))
        .unwrap();
    let errors = &results.get(CORE).unwrap().errors;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("unable to load hvir"));
    assert!(harness.called().is_empty());
}

#[test]
fn patch_errors_stop_the_compile() {
    let harness = Harness::new(Behavior::PatchError("unknown object [foo~]"));
    write(harness.path("patch.json"), "{}").unwrap();
    let results = harness
        .compiler
        .compile_dataflow(&harness.options("patch.json", &["native", "dpf"]))
        .unwrap();
    assert_eq!(results.get(HVIR).unwrap().errors, ["unknown object [foo~]"]);
    assert!(results.get(CORE).is_none());
    assert!(harness.called().is_empty());
}

#[test]
fn frontend_failure_is_reported() {
    let harness = Harness::new(Behavior::Fail);
    write(harness.path("patch.json"), "{}").unwrap();
    let results = harness
        .compiler
        .compile_dataflow(&harness.options("patch.json", &["native"]))
        .unwrap();
    assert_eq!(
        results.get(HVIR).unwrap().errors,
        ["hvcc-frontend: command not found"]
    );
    assert!(harness.called().is_empty());
}

#[test]
fn frontend_writes_hvir() {
    let harness = Harness::new(Behavior::WriteFile(synth_hvir()));
    write(harness.path("patch.json"), "{}").unwrap();
    let mut options = harness.options("patch.json", &["description"]);
    options.search_paths = vec![harness.path("abstractions")];

    let results = harness.compiler.compile_dataflow(&options).unwrap();
    assert!(!results.has_errors());
    assert!(results.get(HVIR).is_some());

    let requests = harness.requests.borrow();
    assert_eq!(requests.len(), 1);
    let (in_path, out_path, search_paths) = &requests[0];
    assert_eq!(in_path, &harness.path("patch.json"));
    assert_eq!(out_path, &harness.path("out/Untitled.hvir/hvir.json"));
    assert_eq!(search_paths, &[harness.path("abstractions")]);

    let calls = harness.calls.borrow();
    assert_eq!(calls[0].1.c_src_dir, harness.path("out/Untitled.hvir/c_src"));
    assert_eq!(calls[0].1.num_input_channels, 1);
}

#[test]
fn frontend_returns_tree() {
    let harness = Harness::new(Behavior::ReturnTree(synth_hvir()));
    write(harness.path("patch.json"), "{}").unwrap();
    let mut options = harness.options("patch.json", &["native"]);
    options.patch_name = Some("synth".into());

    let results = harness.compiler.compile_dataflow(&options).unwrap();
    let fragment = results.get(HVIR).unwrap();
    assert_eq!(fragment.warnings, ["object [print] has no effect"]);
    assert!(!fragment.payload.contains_key("hvir"));
    // Nothing was written, so the tree must have come from the fragment.
    assert!(!harness.path("out/synth.hvir").exists());
    let calls = harness.calls.borrow();
    assert_eq!(calls[0].1.externs.stats.num_parameters, 1);
    assert_eq!(calls[0].1.c_src_dir, harness.path("out/synth.hvir/c_src"));
}

#[test]
fn patch_meta_is_passed_through() {
    let harness = Harness::new(Behavior::Fail);
    write_hvir(&harness.path("synth.hvir"), &synth_hvir());
    let meta = json!({"dpf": {"project": true, "maker": "Example", "plugin_formats": ["lv2"]}});
    hvcc_ir::json::dump(&harness.path("meta.json"), &meta).unwrap();
    let mut options = harness.options("synth.hvir", &["dpf"]);
    options.patch_meta_file = Some(harness.path("meta.json"));

    harness.compiler.compile_dataflow(&options).unwrap();
    assert_eq!(harness.calls.borrow()[0].1.patch_meta, meta);
}

#[test]
fn invalid_patch_meta() {
    let harness = Harness::new(Behavior::Fail);
    write_hvir(&harness.path("synth.hvir"), &synth_hvir());
    write(harness.path("meta.json"), "{\"dpf\": ").unwrap();
    let mut options = harness.options("synth.hvir", &["dpf"]);
    options.patch_meta_file = Some(harness.path("meta.json"));

    let results = harness.compiler.compile_dataflow(&options).unwrap();
    let errors = &results.get(CORE).unwrap().errors;
    assert!(errors[0].starts_with("unable to load patch meta"));
    assert!(errors[0].contains("meta.json"));
    assert!(harness.called().is_empty());
}

#[test]
fn unknown_generator() {
    let harness = Harness::new(Behavior::Fail);
    write_hvir(&harness.path("synth.hvir"), &synth_hvir());
    let results = harness
        .compiler
        .compile_dataflow(&harness.options("synth.hvir", &["unity", "native"]))
        .unwrap();
    assert!(!results.has_errors());
    assert_eq!(
        results.get(CORE).unwrap().warnings,
        ["unknown generator 'unity'"]
    );
    assert_eq!(harness.called(), ["native"]);
}

#[test]
fn generator_names_ignore_case() {
    let harness = Harness::new(Behavior::Fail);
    write_hvir(&harness.path("synth.hvir"), &synth_hvir());
    harness
        .compiler
        .compile_dataflow(&harness.options("synth.hvir", &["OWL", "Dpf"]))
        .unwrap();
    assert_eq!(harness.called(), ["dpf", "owl"]);
}

#[test]
fn conflicting_names_warn() {
    let harness = Harness::new(Behavior::Fail);
    let mut hvir = synth_hvir();
    hvir["interface"]["parameters"]["cutoff2"] = json!({"name": "cutoff", "direction": "in"});
    write_hvir(&harness.path("synth.hvir"), &hvir);
    let results = harness
        .compiler
        .compile_dataflow(&harness.options("synth.hvir", &[]))
        .unwrap();
    let warnings = &results.get("parameters").unwrap().warnings;
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("'cutoff'"));
}

#[test]
fn generator_failure_aborts() {
    let mut registry = GeneratorRegistry::default();
    registry.register(Broken);
    let compiler = Compiler::new(
        Box::new(FakeFrontend {
            behavior: Behavior::Fail,
            requests: Rc::default(),
        }),
        registry,
    );
    let dir = tempfile::tempdir().unwrap();
    write_hvir(&dir.path().join("synth.hvir"), &synth_hvir());
    let options = CompileOptions {
        in_path: dir.path().join("synth.hvir"),
        out_dir: dir.path().join("out"),
        generators: ["daisy".to_string()].into(),
        ..Default::default()
    };
    match compiler.compile_dataflow(&options) {
        Err(CompileError::Generator { name, error }) => {
            assert_eq!(name, "daisy");
            assert_eq!(error.to_string(), "libDaisy not found");
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(results) => panic!("compile succeeded: {results:?}"),
    }
}

#[test]
fn description_end_to_end() {
    let mut registry = GeneratorRegistry::default();
    registry.register(Description);
    let compiler = Compiler::new(
        Box::new(FakeFrontend {
            behavior: Behavior::WriteFile(synth_hvir()),
            requests: Rc::default(),
        }),
        registry,
    );
    let dir = tempfile::tempdir().unwrap();
    write(dir.path().join("synth.json"), "{}").unwrap();
    let options = CompileOptions {
        in_path: dir.path().join("synth.json"),
        out_dir: dir.path().join("build"),
        patch_name: Some("synth".into()),
        generators: ["description".to_string()].into(),
        ..Default::default()
    };
    let results = compiler.compile_dataflow(&options).unwrap();
    assert!(!results.has_errors());

    let path = dir.path().join("build/description/synth.description.json");
    assert_eq!(results.get("description").unwrap().payload["files"], json!([path]));
    let written: Value = hvcc_ir::json::load(&path).unwrap();
    assert_eq!(written["num_input_channels"], json!(1));
    assert_eq!(written["parameters"]["in"][0][0], json!("cutoff"));
    assert_eq!(written["tables"][0][1]["size"], json!(512));
}

#[test]
fn patch_name_must_be_a_file_name() {
    let harness = Harness::new(Behavior::WriteFile(synth_hvir()));
    write(harness.path("patch.json"), "{}").unwrap();
    let mut options = harness.options("patch.json", &["description"]);
    options.patch_name = Some("../escape".into());

    let results = harness.compiler.compile_dataflow(&options).unwrap();
    assert_eq!(
        results.get(CORE).unwrap().errors,
        ["invalid patch name '../escape'"]
    );
    assert!(harness.requests.borrow().is_empty());
    assert!(harness.called().is_empty());
    assert!(!harness.path("escape.hvir").exists());
}

#[test]
fn out_dir_created_only_for_generators() {
    let harness = Harness::new(Behavior::Fail);
    write_hvir(&harness.path("synth.hvir"), &synth_hvir());

    let results = harness
        .compiler
        .compile_dataflow(&harness.options("synth.hvir", &[]))
        .unwrap();
    assert!(!results.has_errors());
    assert!(!harness.path("out").exists());

    let results = harness
        .compiler
        .compile_dataflow(&harness.options("synth.hvir", &["unity"]))
        .unwrap();
    assert!(!results.has_errors());
    assert!(!harness.path("out").exists());

    harness
        .compiler
        .compile_dataflow(&harness.options("synth.hvir", &["native"]))
        .unwrap();
    assert!(harness.path("out").is_dir());
}
