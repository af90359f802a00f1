//! End-to-end tests: definitions file and modules on disk through to the
//! generated C++ file.

use std::fs;
use std::path::{Path, PathBuf};

use js2c::{build, BuildOptions, Js2cConfig};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const MACROS: &str = "\
# Natives macros
const kMaxCount = 100;          # upper bound
const kName = 'natives';

macro IS_NULL(arg)         = (arg === null);
macro ADD(a, b)            = (a + b);
macro WRAP(x)              = DOUBLE_IT(x);
macro DOUBLE_IT(y)         = (y*2);
python macro CHAR_CODE(s)  = ord(s[1]);
";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn options(dir: &TempDir, sources: Vec<PathBuf>) -> BuildOptions {
    BuildOptions {
        output: dir.path().join("gen").join("natives.cc"),
        sources,
        macros: None,
        debug: false,
    }
}

#[test]
fn test_build_writes_cpp_source() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("gen")).unwrap();
    let macros = write(dir.path(), "macros.py", MACROS);
    let a = write(dir.path(), "a.js", "var n = ADD(kMaxCount, 1);");
    let b = write(dir.path(), "b.js", "x");

    let opts = options(&dir, vec![a, macros, b]);
    let report = build(&opts, &Js2cConfig::default()).unwrap();
    assert_eq!(report.modules, vec!["a.js".to_string(), "b.js".to_string()]);

    let expanded_a = "var n = (100 + 1);";
    assert_eq!(report.bytes, expanded_a.len() + 1);

    let cpp = fs::read_to_string(&opts.output).unwrap();
    let bytes: Vec<String> = format!("{}x", expanded_a)
        .bytes()
        .map(|b| b.to_string())
        .collect();
    assert!(cpp.contains("#include <string>"));
    assert!(cpp.contains("namespace adblock {"));
    assert!(cpp.contains(&format!(
        "static const char sources[] = {{ {} }};",
        bytes.join(", ")
    )));
    assert!(cpp.contains(&format!(
        "std::string js_sources[] = {{ std::string(\"a.js\"), std::string(sources + 0, {len}), \
         std::string(\"b.js\"), std::string(sources + {len}, 1), std::string() }};",
        len = expanded_a.len()
    )));
    assert!(cpp.ends_with("}  // namespace adblock\n"));
}

#[test]
fn test_debug_dump_and_forward_reference() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("gen")).unwrap();
    let macros = write(dir.path(), "macros.py", MACROS);
    let module = write(
        dir.path(),
        "util.js",
        "if (IS_NULL(o)) return WRAP(5) + CHAR_CODE('A');",
    );

    let mut opts = options(&dir, vec![macros, module]);
    opts.debug = true;
    let report = build(&opts, &Js2cConfig::default()).unwrap();

    let debug_dir = report.debug_dir.unwrap();
    assert_eq!(debug_dir, dir.path().join("gen").join("js"));
    assert_eq!(
        fs::read_to_string(debug_dir.join("util.js")).unwrap(),
        "if ((o === null)) return (5*2) + 65;"
    );
}

#[test]
fn test_eval_aborts_build_naming_module() {
    let dir = TempDir::new().unwrap();
    let macros = write(dir.path(), "macros.py", MACROS);
    let module = write(dir.path(), "bad.js", "var r = eval('1');");

    let opts = BuildOptions {
        output: dir.path().join("natives.cc"),
        sources: vec![macros, module],
        macros: None,
        debug: false,
    };
    let err = build(&opts, &Js2cConfig::default()).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Eval disallowed in natives"));
    assert!(message.contains("bad.js"));
    assert!(!opts.output.exists());
}

#[test]
fn test_explicit_macros_and_config_overrides() {
    let dir = TempDir::new().unwrap();
    let defs = write(dir.path(), "defs.txt", "macro GET(a) = data.a;");
    let module = write(dir.path(), "get.js", "// read\nvar v = GET(key);");

    let config = Js2cConfig {
        namespace: "natives".to_string(),
        array_name: "natives_sources".to_string(),
        strip_comments: true,
        param_substitution: macro_core::ParamSubstitution::Token,
        ..Js2cConfig::default()
    };
    let opts = BuildOptions {
        output: dir.path().join("out.cc"),
        sources: vec![module],
        macros: Some(defs),
        debug: true,
    };
    build(&opts, &config).unwrap();

    assert_eq!(
        fs::read_to_string(dir.path().join("js").join("get.js")).unwrap(),
        "\nvar v = data.key;"
    );
    let cpp = fs::read_to_string(&opts.output).unwrap();
    assert!(cpp.contains("namespace natives {"));
    assert!(cpp.contains("std::string natives_sources[] = {"));
}

#[test]
fn test_definition_errors_name_file_and_line() {
    let dir = TempDir::new().unwrap();
    let macros = write(dir.path(), "macros.py", "const A = 1;\nnot a definition\n");
    let module = write(dir.path(), "a.js", "A");

    let opts = options(&dir, vec![macros, module]);
    let message = format!("{:#}", build(&opts, &Js2cConfig::default()).unwrap_err());
    assert!(message.contains("macros.py"));
    assert!(message.contains("Illegal line 2: not a definition"));
}

#[test]
fn test_non_ascii_module_is_rejected() {
    let dir = TempDir::new().unwrap();
    let module = write(dir.path(), "intl.js", "var s = 'ü';");

    let opts = BuildOptions {
        output: dir.path().join("natives.cc"),
        sources: vec![module],
        macros: None,
        debug: false,
    };
    let message = format!("{:#}", build(&opts, &Js2cConfig::default()).unwrap_err());
    assert!(message.contains("Non-ASCII byte"));
    assert!(message.contains("intl.js"));
}
