//! Integration tests for the translation pipeline.

use op2_translator::frontend::extract_wrapper_calls;
use op2_translator::ir::kernel::Addressing;
use op2_translator::prelude::*;
use op2_translator::output::output_path;
use std::fs;
use std::path::{Path, PathBuf};

const AIRFOIL: &str = r#"#include <stdio.h>
#include "op_seq.h"

#define NVAR 4

// op_par_loop(commented_out, "x", cells, op_arg_gbl(&x, 1, "int", OP_READ));

int main(int argc, char **argv) {
  op_init(argc, argv, 2);

  op_set nodes = op_decl_set(nnode, "nodes");
  op_set cells = op_decl_set(ncell, "cells");

  op_decl_const(1, "double", &gam);
  op_decl_const(NVAR, "double", &qinf);

  op_par_loop(save_soln, "save_soln", cells,
              op_arg_dat(p_q, -1, OP_ID, NVAR, "double", OP_READ),
              op_arg_dat(p_qold, -1, OP_ID, NVAR, "double", OP_WRITE));

  op_par_loop(res_calc, "res_calc", edges,
              op_arg_dat(p_x, 0, pedge, 2, "double", OP_READ),
              op_arg_dat(p_x, 1, pedge, 2, "double", OP_READ),
              op_arg_dat(p_res, 0, pecell, NVAR, "double", OP_INC),
              op_arg_dat(p_res, 1, pecell, NVAR, "double", OP_INC),
              op_arg_gbl(&rms, 1, "double", OP_INC));

  op_exit();
}
"#;

const SECOND: &str = r#"#include "op_seq.h"
extern double gam;

void again() {
    op_par_loop(save_soln,"save soln again",cells,
                op_arg_dat(p_q2,-1,OP_ID,4,"double",OP_READ),
                op_arg_dat(p_qold2,-1,OP_ID,4,"double",OP_WRITE));
}
"#;

const KERNELS: &str = "inline void save_soln(const double *q, double *qold) {}\n\
                       inline void res_calc(const double *x1, const double *x2, double *r1, double *r2, double *rms) {}\n";

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    fn write(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    fn config(&self, paths: &[PathBuf]) -> TranslatorConfig {
        TranslatorConfig::from_paths(paths)
            .working_dir(self.dir.path())
            .output_dir(self.dir.path())
    }
}

fn translate(sources: &[(&str, &str)]) -> (Translator, Vec<String>) {
    let mut translator = Translator::new(TranslatorConfig::new().banner(""));
    translator.prepare_sources(sources.iter().map(|(p, t)| (Path::new(*p), *t)));
    let outputs = sources
        .iter()
        .map(|(p, t)| translator.translate_source(Path::new(p), t).unwrap())
        .collect();
    (translator, outputs)
}

#[test]
fn test_full_pipeline() {
    let ws = Workspace::new();
    let main = ws.write("airfoil.cpp", AIRFOIL);
    let second = ws.write("again.cpp", SECOND);
    let kernels = ws.write("kernels/all_kernels.h", KERNELS);
    let kernel_dir = kernels.parent().unwrap().to_path_buf();

    let translator = op2_translator::run(ws.config(&[main.clone(), second.clone(), kernel_dir])).unwrap();

    assert_eq!(translator.kernels().len(), 2);
    assert_eq!(translator.constants().len(), 2);
    assert_eq!(translator.sets().len(), 2);
    assert!(translator.constants().get("gam").unwrap().user_declared);
    assert!(!translator.constants().get("qinf").unwrap().user_declared);
    assert_eq!(translator.constants().get("qinf").unwrap().dim, Resolved::Int(4));
    for kernel in translator.kernels().iter() {
        assert_eq!(kernel.decl_path(), Some(kernels.as_path()));
    }

    let res_calc = translator.kernels().get_by_name("res_calc").unwrap();
    assert_eq!(res_calc.ninds(), 2);
    assert_eq!(res_calc.indirection.inds, vec![1, 1, 2, 2, 0]);

    let rewritten = fs::read_to_string(output_path(&main, "_op")).unwrap();
    assert!(rewritten.starts_with("//\n// auto-generated by op2-translator\n//\n\n#include <stdio.h>\n#include \"op_lib_cpp.h\"\n"));
    assert!(rewritten.contains("void op_par_loop_save_soln(char const *, op_set,\n  op_arg,\n  op_arg );\n"));
    assert!(rewritten.contains("op_decl_const2(\"qinf\",4,\"double\",&qinf);"));
    assert!(rewritten.contains("op_par_loop_res_calc(\"res_calc\",edges,\n"));
    assert!(rewritten.contains("// op_par_loop(commented_out"));

    let again = fs::read_to_string(output_path(&second, "_op")).unwrap();
    assert!(again.contains("void op_par_loop_save_soln("));
    assert!(!again.contains("void op_par_loop_res_calc("));

    let manifest = ws.dir.path().join("airfoil_kernels.json");
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(manifest).unwrap()).unwrap();
    assert_eq!(json["kernels"].as_array().unwrap().len(), 2);
    assert_eq!(json["macros"]["NVAR"], "4");
}

#[test]
fn test_declaration_not_found() {
    let ws = Workspace::new();
    let main = ws.write("airfoil.cpp", AIRFOIL);
    ws.write("save_soln.h", "inline void save_soln(const double *q, double *qold) {}\n");

    let err = op2_translator::run(ws.config(&[main.clone()])).unwrap_err();
    let err = err.downcast_ref::<TranslatorError>().unwrap();
    assert_eq!(err.exit_code(), 2);
    match err {
        TranslatorError::DeclarationNotFound { kernels } => assert_eq!(kernels, &vec!["res_calc".to_string()]),
        other => panic!("unexpected error {other}"),
    }
    // rewritten files are kept
    assert!(output_path(&main, "_op").is_file());
}

#[test]
fn test_redeclaration_conflict_is_fatal() {
    let ws = Workspace::new();
    let a = ws.write("a.cpp", r#"op_par_loop(k, "k", cells, op_arg_dat(p_q, -1, OP_ID, 4, "double", OP_READ));"#);
    let b = ws.write("b.cpp", r#"op_par_loop(k, "k", cells, op_arg_dat(p_q, -1, OP_ID, 4, "double", OP_RW));"#);

    let err = op2_translator::run(ws.config(&[a, b])).unwrap_err();
    let err = err.downcast_ref::<TranslatorError>().unwrap();
    assert!(matches!(err, TranslatorError::RedeclarationConflict { kernel, .. } if kernel == "k"));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_rejected_calls_fail_after_rewrite() {
    let ws = Workspace::new();
    let a = ws.write(
        "a.cpp",
        "op_init(argc, argv, 2);\n\
         op_par_loop(bad, \"bad\", cells, op_arg_dat(p_q, -1, OP_ID, 4, OP_READ));\n\
         op_par_loop(good, \"good\", cells, op_arg_dat(p_q, -1, OP_ID, 4, \"double\", OP_READ));\n\
         op_exit();\n",
    );
    ws.write("good.h", "inline void good(const double *q) {}\n");

    let err = op2_translator::run(ws.config(&[a.clone()])).unwrap_err();
    let err = err.downcast_ref::<TranslatorError>().unwrap();
    assert!(matches!(err, TranslatorError::RejectedCalls { count: 1 }));
    assert_eq!(err.exit_code(), 1);

    let rewritten = fs::read_to_string(output_path(&a, "_op")).unwrap();
    assert!(rewritten.contains("op_par_loop(bad, \"bad\", cells, op_arg_dat(p_q, -1, OP_ID, 4, OP_READ));"));
    assert!(rewritten.contains("op_par_loop_good(\"good\",cells,"));
}

#[test]
fn test_structural_dedup_across_files() {
    let (translator, outputs) = translate(&[
        ("a.cpp", AIRFOIL),
        ("b.cpp", SECOND),
        (
            "c.cpp",
            "op_par_loop(save_soln /* again */, \"s\", cells, op_arg_dat(q, -1, OP_ID, 2*2, \"double\", OP_READ), op_arg_dat(qo, -1, OP_ID, 4, \"double\", OP_WRITE));",
        ),
    ]);
    assert_eq!(translator.kernels().len(), 2);
    assert_eq!(outputs.len(), 3);
    let save = translator.kernels().get_by_name("save_soln").unwrap();
    assert_eq!(save.args[0].data, "p_q");
}

#[test]
fn test_constant_conflict() {
    let (translator, _) = translate(&[
        ("a.cpp", "op_decl_const(1, \"double\", &dt);\n"),
        ("b.cpp", "op_decl_const(1, \"float\", &dt);\n"),
    ]);
    assert_eq!(translator.constants().len(), 1);
    assert_eq!(translator.constants().get("dt").unwrap().type_name(), "double");
    let conflicts = translator
        .diagnostics()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::ConstantConflict)
        .count();
    assert_eq!(conflicts, 1);
}

#[test]
fn test_grouping_determinism() {
    let (translator, _) = translate(&[(
        "a.cpp",
        r#"op_par_loop(k, "k", edges,
             op_arg_dat(d1, 0, m1, 1, "float", OP_READ),
             op_arg_dat(d1, 1, m1, 1, "float", OP_READ),
             op_arg_dat(d1, 0, m1, 1, "float", OP_INC));"#,
    )]);
    let k = translator.kernels().get_by_name("k").unwrap();
    assert_eq!(k.indirection.inds, vec![1, 1, 2]);
    assert_eq!(k.ninds(), 2);
}

#[test]
fn test_semantic_diagnostics() {
    let (translator, _) = translate(&[(
        "a.cpp",
        r#"op_par_loop(k, "k", cells,
             op_arg_dat(p_q, 3, OP_ID, 4, "double", OP_READ),
             op_arg_gbl(&g, 1, "double", OP_WRITE),
             op_arg_dat(p_r, 0, pmap, 1, "double", OP_MAX));"#,
    )]);
    let k = translator.kernels().get_by_name("k").unwrap();
    let semantic = translator
        .diagnostics()
        .iter()
        .filter(|d| d.kind == DiagnosticKind::Semantic)
        .count();
    assert_eq!(semantic, 3);
    // still registered
    assert_eq!(k.nargs(), 3);
    assert_eq!(k.signature.args[0].addressing, Addressing::Direct);
}

#[test]
fn test_round_trip() {
    let source = r#"#define NDIM 2
#define NV (NDIM + 2)
  op_par_loop(bres_calc, "bres_calc", bedges,
              op_arg_dat(p_x, 0, pbedge, NDIM, "double", OP_READ),
              op_arg_dat(p_x, 1, pbedge, NDIM, "double", OP_READ),
              op_opt_arg_dat(use_q, p_q, 0, pbecell, NV, "double:soa", OP_READ),
              op_arg_dat(p_res, 0, pbecell, NV, "double", OP_INC),
              op_arg_gbl(&eps, 1, "double", OP_READ),
              op_arg_dat(p_bound, -1, OP_ID, 1, "int", OP_READ));
"#;
    let (translator, outputs) = translate(&[("a.cpp", source)]);
    let registered = translator.kernels().get_by_name("bres_calc").unwrap();
    let wrapper = extract_wrapper_calls(&outputs[0]).remove(0).unwrap();
    assert_eq!(wrapper.kernel, "bres_calc");
    assert_eq!(wrapper.nargs(), 6);

    let reparsed = KernelBuilder::new(translator.macros()).build(&wrapper).descriptor;
    assert_eq!(reparsed.signature, registered.signature);
    assert!(outputs[0].contains("op_opt_arg_dat(use_q,p_q,0,pbecell,4,\"double:soa\",OP_READ)"));
    assert!(translator
        .diagnostics()
        .iter()
        .all(|d| d.kind != DiagnosticKind::RewriteMismatch));
}

#[test]
fn test_byte_fidelity_outside_splices() {
    let prefix = "/* héllo op_par_loop( */\nstatic const char *s = \"op_decl_const(1,\\\"int\\\",&x);\";\n";
    let call = "op_par_loop(k, \"k\", cells, op_arg_gbl(&x, 1, \"int\", OP_READ));";
    let suffix = "\n// trailing \u{2603}\n  int   spacing  =  1 ;\n";
    let source = format!("{}{}{}", prefix, call, suffix);

    let (_, outputs) = translate(&[("a.cpp", &source)]);
    let out = &outputs[0];
    assert!(out.starts_with(prefix));
    assert!(out.ends_with(suffix));
    assert_eq!(&out[prefix.len()..out.len() - suffix.len()], "op_par_loop_k(\"k\",cells,\n            op_arg_gbl(&x,1,\"int\",OP_READ));");
}

#[test]
fn test_auto_soa_rewrites_init() {
    let mut translator = Translator::new(TranslatorConfig::new().banner("").auto_soa(true));
    let out = translator
        .translate_source(
            Path::new("a.cpp"),
            "op_init(argc, argv, 2);\nop_par_loop(k, \"k\", cells, op_arg_dat(p_q, -1, OP_ID, 4, \"double\", OP_READ));\n",
        )
        .unwrap();
    assert!(out.starts_with("op_init_soa(argc, argv, 2,1);\n"));
    assert!(translator.files()[0].any_soa);
    let k = translator.kernels().get_by_name("k").unwrap();
    assert!(k.signature.args[0].soa);
}
