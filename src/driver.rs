//! Translation driver.
//!
//! [`Translator`] is the run context: it owns the macro table, the
//! registries and the diagnostics of one run. Units are processed strictly
//! in input order:
//!
//! ```text
//! harvest macros/externs → per unit: scan → constants/sets → loops → IR → registries → rewrite
//!                        → locate declarations → backends
//! ```

use crate::codegen::{Backend, BackendInputs, FileRewrite, ManifestBackend, RewrittenUnit};
use crate::config::TranslatorConfig;
use crate::frontend::decls::extern_globals;
use crate::frontend::{extract_wrapper_calls, scan_unit, CallCensus, ScannedUnit};
use crate::ir::{ConstantRegistry, KernelBuilder, KernelRegistry, SetRegistry};
use crate::locate::DeclarationLocator;
use crate::macros::{MacroHarvester, MacroResolver, MacroTable};
use crate::output::output_path;
use crate::utils::errors::{Diagnostic, DiagnosticKind, ExtractError, TranslateResult, TranslatorError};
use crate::utils::location::SourceMap;
use anyhow::Result;
use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-unit outcome.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub path: PathBuf,
    /// Where the rewritten unit was written, if it was written to disk
    pub output: Option<PathBuf>,
    /// Loop calls rewritten
    pub loops: usize,
    /// Calls rejected as malformed
    pub rejected: usize,
    /// Any argument in the unit uses SOA layout
    pub any_soa: bool,
}

/// Run context for one translation.
#[derive(Debug)]
pub struct Translator {
    config: TranslatorConfig,
    macros: MacroTable,
    declared_globals: HashSet<String>,
    kernels: KernelRegistry,
    constants: ConstantRegistry,
    sets: SetRegistry,
    census: CallCensus,
    diagnostics: Vec<Diagnostic>,
    files: Vec<FileSummary>,
    timestamp: u64,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            config,
            macros: MacroTable::default(),
            declared_globals: HashSet::new(),
            kernels: KernelRegistry::new(),
            constants: ConstantRegistry::new(),
            sets: SetRegistry::new(),
            census: CallCensus::default(),
            diagnostics: Vec::new(),
            files: Vec::new(),
            timestamp,
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn kernels(&self) -> &KernelRegistry {
        &self.kernels
    }

    pub fn constants(&self) -> &ConstantRegistry {
        &self.constants
    }

    pub fn sets(&self) -> &SetRegistry {
        &self.sets
    }

    pub fn census(&self) -> CallCensus {
        self.census
    }

    /// Every diagnostic recorded so far, in emission order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn files(&self) -> &[FileSummary] {
        &self.files
    }

    /// Calls rejected as malformed across all units.
    pub fn rejected_calls(&self) -> usize {
        self.files.iter().map(|f| f.rejected).sum()
    }

    /// Read every input and harvest macros and `extern` globals.
    pub fn prepare(&mut self) -> TranslateResult<()> {
        let mut sources = Vec::with_capacity(self.config.inputs.len());
        for path in &self.config.inputs {
            info!("Parsing file '{}' for macro definitions.", path.display());
            let text = fs::read_to_string(path).map_err(|e| TranslatorError::io(path, e))?;
            sources.push((path.clone(), text));
        }
        self.prepare_sources(sources.iter().map(|(p, t)| (p.as_path(), t.as_str())));
        Ok(())
    }

    /// Harvest macros and `extern` globals from in-memory sources.
    pub fn prepare_sources<'s, I>(&mut self, sources: I)
    where
        I: IntoIterator<Item = (&'s Path, &'s str)>,
    {
        let mut harvester = MacroHarvester::new();
        for (path, text) in sources {
            harvester.harvest(text, path);
            self.declared_globals.extend(extern_globals(text));
        }
        let (table, findings) = harvester.finish();
        for diag in findings {
            record(&mut self.diagnostics, diag);
        }
        debug!("{} macro definitions resolved", table.len());
        self.macros = table;
    }

    /// Read, translate and write one unit.
    pub fn process_file(&mut self, path: &Path) -> TranslateResult<PathBuf> {
        let text = fs::read_to_string(path).map_err(|e| TranslatorError::io(path, e))?;
        let rewritten = self.translate_source(path, &text)?;

        let out = output_path(path, &self.config.output_tag);
        if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| TranslatorError::io(dir, e))?;
        }
        fs::write(&out, rewritten).map_err(|e| TranslatorError::io(&out, e))?;
        info!("wrote {}", out.display());
        if let Some(summary) = self.files.last_mut() {
            summary.output = Some(out.clone());
        }
        Ok(out)
    }

    /// Translate one unit held in memory and return the rewritten text.
    pub fn translate_source(&mut self, path: &Path, text: &str) -> TranslateResult<String> {
        let file = self.kernels.begin_file(path);
        let map = SourceMap::new(text);
        let unit = scan_unit(text);
        let mut rejected = 0;

        self.census += unit.census;
        report_census(&unit);

        let ScannedUnit { header, consts, sets, loops, inits, .. } = unit;
        let mut reject = |diagnostics: &mut Vec<Diagnostic>, err: &ExtractError| {
            rejected += 1;
            let diag = Diagnostic::from(err).in_file(path).with_span(map.resolve(err.span));
            record(diagnostics, diag.with_note("the call is left unchanged"));
        };

        let mut const_points = Vec::new();
        for decl in consts {
            match decl {
                Ok(decl) => {
                    let dim = self.macros.evaluate(&decl.dim);
                    let name = decl.name().to_string();
                    let user_declared = self.declared_globals.contains(&name);
                    let (_, findings) = self.constants.insert(&name, &decl.typ, dim.clone(), user_declared);
                    if findings.is_empty() {
                        info!("global constant ({}) of size {}", name, dim);
                    }
                    for diag in findings {
                        record(&mut self.diagnostics, diag.in_file(path).with_span(map.resolve(decl.span)));
                    }
                    const_points.push((decl, dim));
                }
                Err(err) => reject(&mut self.diagnostics, &err),
            }
        }

        for set in sets {
            match set {
                Ok(set) => {
                    self.sets.insert(&set.name);
                }
                Err(err) => reject(&mut self.diagnostics, &err),
            }
        }

        let builder = KernelBuilder::new(&self.macros).auto_soa(self.config.auto_soa);
        let mut any_soa = false;
        let mut loop_points = Vec::new();
        for call in loops {
            let call = match call {
                Ok(call) => call,
                Err(err) => {
                    reject(&mut self.diagnostics, &err);
                    continue;
                }
            };
            info!("processing kernel {} with {} arguments", call.kernel, call.nargs());
            let built = builder.build(&call);
            for err in &built.diagnostics {
                let diag = Diagnostic::from(err)
                    .in_file(path)
                    .with_span(map.resolve(call.span))
                    .with_note(format!("in kernel {}", call.kernel));
                record(&mut self.diagnostics, diag);
            }
            any_soa |= built.any_soa;
            let args = built.descriptor.args.clone();
            let summary = built.descriptor.summary();
            let (_, is_new) = self.kernels.insert(file, built.descriptor)?;
            if is_new {
                debug!("new kernel {}:\n{}", call.kernel, summary);
            } else {
                debug!("repeated kernel with compatible arguments: {}", call.kernel);
            }
            loop_points.push((call, args));
        }
        if any_soa {
            info!("{} uses SOA layout", path.display());
        }

        let mut init_points = Vec::new();
        if self.config.auto_soa {
            for init in inits {
                match init {
                    Ok(init) => init_points.push(init),
                    Err(err) => reject(&mut self.diagnostics, &err),
                }
            }
        }

        let mut rewrite = FileRewrite::new(text);
        match &header {
            Some(include) => rewrite.header(include, self.kernels.kernels_in_file(file)),
            None => debug!("{} has no API header include", path.display()),
        }
        for (decl, dim) in &const_points {
            rewrite.constant(decl, dim);
        }
        for (call, args) in &loop_points {
            rewrite.par_loop(call, args);
        }
        for init in &init_points {
            rewrite.init(init);
        }
        debug!("{}: {} splice point(s)", path.display(), rewrite.splice_count());
        let rewritten = rewrite.finish(&self.config.banner)?;
        self.check_wrappers(path, &rewritten);

        self.files.push(FileSummary {
            path: path.to_path_buf(),
            output: None,
            loops: loop_points.len(),
            rejected,
            any_soa,
        });
        Ok(rewritten.text)
    }

    /// Re-parse each emitted wrapper call and compare it with the registry.
    fn check_wrappers(&mut self, path: &Path, unit: &RewrittenUnit) {
        let builder = KernelBuilder::new(&self.macros).auto_soa(self.config.auto_soa);
        for wrapper in &unit.wrappers {
            let reparsed = extract_wrapper_calls(&wrapper.text).into_iter().next();
            let registered = self.kernels.get_by_name(&wrapper.kernel).map(|k| &k.signature);
            let consistent = match (reparsed, registered) {
                (Some(Ok(call)), Some(signature)) => builder.build(&call).descriptor.signature == *signature,
                _ => false,
            };
            if !consistent {
                record(
                    &mut self.diagnostics,
                    Diagnostic::error(
                        DiagnosticKind::RewriteMismatch,
                        format!("rewritten call to kernel {} does not match its registered descriptor", wrapper.kernel),
                    )
                    .in_file(path),
                );
            }
        }
    }

    /// End-of-run checks: lifecycle advice, rejected calls and declarations.
    pub fn finish(&mut self) -> TranslateResult<()> {
        self.report_lifecycle();

        let rejected = self.rejected_calls();
        if rejected > 0 {
            return Err(TranslatorError::RejectedCalls { count: rejected });
        }

        DeclarationLocator::new(&self.config.inputs, &self.config.search_dirs)
            .with_working_dir(&self.config.working_dir)
            .resolve_all(&mut self.kernels)
    }

    fn report_lifecycle(&mut self) {
        if self.census.inits == 0 {
            record(
                &mut self.diagnostics,
                Diagnostic::warning(DiagnosticKind::MissingAnnotation, "no call to op_init"),
            );
            if self.config.auto_soa {
                record(
                    &mut self.diagnostics,
                    Diagnostic::note(
                        DiagnosticKind::MissingAnnotation,
                        "code generated with OP_AUTO_SOA, but op_init could not be modified to pass an \
                         additional parameter of 1; make sure OP_AUTO_SOA is set when executing",
                    ),
                );
            }
        }
        if self.census.exits == 0 {
            record(
                &mut self.diagnostics,
                Diagnostic::warning(DiagnosticKind::MissingAnnotation, "no call to op_exit"),
            );
        }
        if self.census.partitions == 0 && self.census.hdf5 > 0 {
            record(
                &mut self.diagnostics,
                Diagnostic::warning(
                    DiagnosticKind::MissingAnnotation,
                    "hdf5 calls without call to op_partition",
                ),
            );
        }
    }

    /// Backends enabled by the configuration.
    pub fn default_backends(&self) -> Vec<Box<dyn Backend>> {
        let mut backends: Vec<Box<dyn Backend>> = Vec::new();
        if self.config.manifest {
            backends.push(Box::new(ManifestBackend));
        }
        backends
    }

    /// Hand the final registries to each backend.
    pub fn run_backends(&self, backends: &[Box<dyn Backend>]) -> Result<()> {
        let master = self.config.master_label();
        let inputs = BackendInputs {
            master_file: &master,
            timestamp: self.timestamp,
            constants: &self.constants,
            kernels: &self.kernels,
            sets: &self.sets,
            macros: &self.macros,
            output_dir: &self.config.output_dir,
        };
        for backend in backends {
            info!("running {} backend", backend.name());
            backend.generate(&inputs)?;
        }
        Ok(())
    }
}

fn record(diagnostics: &mut Vec<Diagnostic>, diag: Diagnostic) {
    diag.emit();
    diagnostics.push(diag);
}

fn report_census(unit: &ScannedUnit) {
    let census = unit.census;
    if census.inits > 0 {
        info!("contains op_init call");
    }
    if census.exits > 0 {
        info!("contains op_exit call");
    }
    if census.partitions > 0 {
        info!("contains op_partition call");
    }
    if census.hdf5 > 0 {
        info!("contains op_hdf5 calls");
    }
}

/// Run a full translation: prepare, rewrite every unit, check, and generate.
pub fn run(config: TranslatorConfig) -> Result<Translator> {
    let inputs = config.inputs.clone();
    let mut translator = Translator::new(config);
    translator.prepare()?;
    for (i, input) in inputs.iter().enumerate() {
        info!("Processing file {} of {}: {}", i + 1, inputs.len(), input.display());
        translator.process_file(input)?;
    }
    translator.finish()?;
    let backends = translator.default_backends();
    translator.run_backends(&backends)?;
    Ok(translator)
}
