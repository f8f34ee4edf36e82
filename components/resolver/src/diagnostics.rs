//! Per-module, per-stage diagnostic collection

use core_types::{Diagnostic, DiagnosticBucket, ModuleId};

/// Diagnostics of all loaded modules, one bucket per front-end stage
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    modules: Vec<[Vec<Diagnostic>; 4]>,
}

fn slot(bucket: DiagnosticBucket) -> usize {
    match bucket {
        DiagnosticBucket::Lexical => 0,
        DiagnosticBucket::Syntax => 1,
        DiagnosticBucket::Type => 2,
        DiagnosticBucket::Codegen => 3,
    }
}

impl Diagnostics {
    /// Empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic
    pub fn push(&mut self, module: ModuleId, bucket: DiagnosticBucket, diagnostic: Diagnostic) {
        tracing::debug!(?module, ?bucket, message = %diagnostic.message, "diagnostic");
        let index = module.index();
        if self.modules.len() <= index {
            self.modules.resize_with(index + 1, Default::default);
        }
        self.modules[index][slot(bucket)].push(diagnostic);
    }

    /// Drop a module's diagnostics of one stage before that stage reruns
    pub fn clear(&mut self, module: ModuleId, bucket: DiagnosticBucket) {
        if let Some(buckets) = self.modules.get_mut(module.index()) {
            buckets[slot(bucket)].clear();
        }
    }

    /// Diagnostics of one module and stage
    pub fn get(&self, module: ModuleId, bucket: DiagnosticBucket) -> &[Diagnostic] {
        self.modules
            .get(module.index())
            .map(|b| b[slot(bucket)].as_slice())
            .unwrap_or(&[])
    }

    /// All diagnostics, ordered by module then stage
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, DiagnosticBucket, &Diagnostic)> {
        self.modules.iter().enumerate().flat_map(|(m, buckets)| {
            DiagnosticBucket::ALL.into_iter().flat_map(move |bucket| {
                buckets[slot(bucket)]
                    .iter()
                    .map(move |d| (ModuleId::new(m), bucket, d))
            })
        })
    }

    /// Total number of diagnostics
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether nothing was reported
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of error-severity diagnostics
    pub fn error_count(&self) -> usize {
        self.iter().filter(|(_, _, d)| d.is_error()).count()
    }
}
