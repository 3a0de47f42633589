//! End-to-end scenarios: each writes a `.lox` script to a temp file, runs
//! the built `lox` binary against it, and asserts on captured stdout.

use std::io::Write;
use std::process::Command;

struct ScriptFile(std::path::PathBuf);

impl ScriptFile {
    fn new(name: &str, source: &str) -> Self {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(source.as_bytes()).unwrap();
        Self(path)
    }
}

impl Drop for ScriptFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn run(name: &str, source: &str) -> (String, i32) {
    let script = ScriptFile::new(name, source);
    let output = Command::new(env!("CARGO_BIN_EXE_lox")).arg(&script.0).output().unwrap();
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

#[test]
fn arithmetic_precedence() {
    let (stdout, code) = run("e2e_arithmetic.lox", "print 1 + 2 * 3;");
    assert_eq!(stdout, "7\n");
    assert_eq!(code, 0);
}

#[test]
fn string_concatenation() {
    let (stdout, _) = run("e2e_concat.lox", "var a = \"hi\"; print a + \" there\";");
    assert_eq!(stdout, "hi there\n");
}

#[test]
fn closures_keep_separate_counters() {
    let source = "fun make(){ var i=0; fun inc(){ i = i+1; return i; } return inc; } \
                  var c = make(); print c(); print c(); print c();";
    let (stdout, _) = run("e2e_closures.lox", source);
    assert_eq!(stdout, "1\n2\n3\n");
}

#[test]
fn single_inheritance_and_super() {
    let source = "class A{ greet(){ print \"A\"; } } \
                  class B < A { greet(){ super.greet(); print \"B\"; } } \
                  B().greet();";
    let (stdout, _) = run("e2e_inherit.lox", source);
    assert_eq!(stdout, "A\nB\n");
}

#[test]
fn array_builtin_and_len() {
    let source = "var xs = array(); xs.append(1); xs.append(2); xs.append(3); \
                  print xs; print len(xs);";
    let (stdout, _) = run("e2e_array.lox", source);
    assert_eq!(stdout, "[1, 2, 3]\n3\n");
}

#[test]
fn try_catch_finally_runs_both_handlers() {
    let source = "try { throw \"boom\"; } catch (e) { print e; } finally { print \"done\"; }";
    let (stdout, _) = run("e2e_try.lox", source);
    assert_eq!(stdout, "boom\ndone\n");
}

#[test]
fn division_by_zero_raises_and_exits_nonzero() {
    let (_, code) = run("e2e_divzero.lox", "print 1 / 0;");
    assert_ne!(code, 0);
}

#[test]
fn property_access_on_nil_raises() {
    let (_, code) = run("e2e_nil_prop.lox", "print nil.x;");
    assert_ne!(code, 0);
}

#[test]
fn calling_a_non_callable_raises() {
    let (_, code) = run("e2e_noncallable.lox", "var x = 1; x();");
    assert_ne!(code, 0);
}

#[test]
fn wrong_arity_raises() {
    let (_, code) = run("e2e_arity.lox", "fun f(a, b) { return a + b; } f(1);");
    assert_ne!(code, 0);
}

#[test]
fn return_at_top_level_is_a_resolution_error() {
    let (_, code) = run("e2e_top_return.lox", "return 1;");
    assert_ne!(code, 0);
}

#[test]
fn break_outside_loop_is_a_resolution_error() {
    let (_, code) = run("e2e_top_break.lox", "break;");
    assert_ne!(code, 0);
}

#[test]
fn redeclaring_in_the_same_block_is_a_resolution_error() {
    let (_, code) = run("e2e_redecl.lox", "{ var a = 1; var a = 2; }");
    assert_ne!(code, 0);
}

#[test]
fn missing_import_is_skipped_and_the_rest_of_the_file_still_runs() {
    let (stdout, code) = run("e2e_missing_import.lox", "import \"does_not_exist.lox\";\nprint 1;");
    assert_eq!(stdout, "1\n");
    assert_eq!(code, 0);
}
