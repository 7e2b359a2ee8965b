//! Indirection grouping and mapping-table canonicalization.
//!
//! Indirect arguments that touch the same dataset through the same mapping
//! table, with the same element type and access mode, form one indirect
//! group. Group numbers are 1-based; 0 marks an argument that is not
//! indirect. The first argument of a group is its representative.

use crate::ir::arg::ArgDescriptor;
use serde::Serialize;

/// Indirection summary of one kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Indirection {
    /// Per argument: 1-based group number, 0 when not indirect
    pub inds: Vec<usize>,
    /// Per group: position of the representative argument
    pub invinds: Vec<usize>,
    /// Per argument: canonical mapping index
    pub mapinds: Vec<usize>,
    /// Per group: canonical representative among groups sharing a mapping table
    pub invmapinds: Vec<usize>,
}

impl Indirection {
    /// Compute the indirection summary of an ordered argument list.
    pub fn compute(args: &[ArgDescriptor]) -> Self {
        let nargs = args.len();
        let mut inds = vec![0; nargs];
        let mut invinds = Vec::new();

        for (i, arg) in args.iter().enumerate() {
            if !arg.is_indirect() || inds[i] != 0 {
                continue;
            }
            invinds.push(i);
            let group = invinds.len();
            for (j, other) in args.iter().enumerate().skip(i) {
                if other.is_indirect() && same_group(arg, other) {
                    inds[j] = group;
                }
            }
        }

        if invinds.is_empty() {
            return Self {
                inds,
                invinds,
                mapinds: vec![0; nargs],
                invmapinds: Vec::new(),
            };
        }

        let mut invmapinds = invinds.clone();
        for i in 0..invinds.len() {
            let map = args[invinds[i]].kind.map_name();
            if let Some(j) = (0..i).find(|&j| args[invinds[j]].kind.map_name() == map) {
                invmapinds[i] = invmapinds[j];
            }
        }

        let mut mapinds: Vec<usize> = (0..nargs).collect();
        for (i, arg) in args.iter().enumerate() {
            if !arg.is_indirect() {
                continue;
            }
            if let Some(j) = (0..i).find(|&j| {
                args[j].kind.map_name() == arg.kind.map_name() && args[j].index == arg.index
            }) {
                mapinds[i] = mapinds[j];
            }
        }

        Self { inds, invinds, mapinds, invmapinds }
    }

    /// Number of indirect groups.
    pub fn ninds(&self) -> usize {
        self.invinds.len()
    }
}

fn same_group(a: &ArgDescriptor, b: &ArgDescriptor) -> bool {
    a.data == b.data && a.ty == b.ty && a.access == b.access && a.kind == b.kind
}
