//! Chunk path resolution.
//!
//! Maps `(data kind, chunk index)` to the concrete file the simulation engine
//! wrote, using the naming scheme `{data_path}/{chunk}/{prefix}_{sim_id}_{chunk}{ext}`.

use std::path::{Path, PathBuf};

use crate::ingest::error::IngestError;
use crate::metadata::SimulationMetadata;

/// The four kinds of chunked simulation output this crate ingests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Atomic trajectory dump (`.dump`)
    Trajectory,
    /// Bond-order dump (`.reaxff`)
    Bonds,
    /// Chemical species census (`.out`)
    Species,
    /// Thermodynamic log (no extension)
    Thermo,
}

impl DataKind {
    /// Filename prefix for this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            DataKind::Trajectory => "dat_trajectory",
            DataKind::Bonds => "dat_bonds",
            DataKind::Species => "dat_species",
            DataKind::Thermo => "log_out",
        }
    }

    /// Filename extension for this kind, including the dot.
    pub fn extension(self) -> &'static str {
        match self {
            DataKind::Trajectory => ".dump",
            DataKind::Bonds => ".reaxff",
            DataKind::Species => ".out",
            DataKind::Thermo => "",
        }
    }

    /// Token separating per-timestep records, for the kinds that are
    /// segmented. Thermo logs are parsed whole-file and have none.
    pub fn delimiter(self) -> Option<&'static str> {
        match self {
            DataKind::Trajectory => Some("ITEM: TIMESTEP"),
            DataKind::Bonds => Some("# Timestep"),
            DataKind::Species => Some("#"),
            DataKind::Thermo => None,
        }
    }

    /// Whether segments keep the delimiter at their head. Species records
    /// are `#`-prefixed header/data line pairs, so the header must survive
    /// segmentation; trajectory and bond parsers expect the delimiter gone.
    pub fn keeps_delimiter(self) -> bool {
        matches!(self, DataKind::Species)
    }

    /// File name for one chunk of this kind.
    pub fn file_name(self, sim_id: &str, chunk: usize) -> String {
        format!("{}_{sim_id}_{chunk}{}", self.prefix(), self.extension())
    }
}

/// Resolve one file path per requested chunk, in ascending chunk order.
///
/// `base` overrides the metadata's `data_path`; `chunks` of `None` means
/// every chunk the metadata declares. Fails with [`IngestError::InvalidChunks`]
/// if any index falls outside `[0, n_chunks)` and with
/// [`IngestError::FileNotFound`] if a resolved file is missing on disk.
pub fn resolve_chunk_paths(
    meta: &SimulationMetadata,
    base: Option<&Path>,
    kind: DataKind,
    chunks: Option<&[usize]>,
) -> Result<Vec<PathBuf>, IngestError> {
    let base = base.unwrap_or(&meta.data_path);
    let n_chunks = meta.partition.n_chunks;

    let requested: Vec<usize> = match chunks {
        Some(set) => set.to_vec(),
        None => meta.all_chunks(),
    };

    let mut paths = Vec::with_capacity(requested.len());
    for chunk in requested {
        if chunk >= n_chunks {
            return Err(IngestError::InvalidChunks {
                requested: chunk,
                n_chunks,
            });
        }
        let path = base
            .join(chunk.to_string())
            .join(kind.file_name(&meta.sim_id, chunk));
        if !path.is_file() {
            return Err(IngestError::FileNotFound(path));
        }
        paths.push(path);
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;

    fn fixture(n_chunks: usize) -> (tempfile::TempDir, SimulationMetadata) {
        let dir = tempfile::tempdir().unwrap();
        for chunk in 0..n_chunks {
            let chunk_dir = dir.path().join(chunk.to_string());
            fs::create_dir_all(&chunk_dir).unwrap();
            for kind in [
                DataKind::Trajectory,
                DataKind::Bonds,
                DataKind::Species,
                DataKind::Thermo,
            ] {
                fs::write(chunk_dir.join(kind.file_name("prelim", chunk)), "").unwrap();
            }
        }
        let meta = SimulationMetadata::from_toml_str(&format!(
            r#"
sim_id = "prelim"
data_path = "{}"
partition = {{ step_size = 0.25, chunk_size = 1000, n_chunks = {n_chunks} }}
box = {{ n_atoms = 10 }}
output = {{ trajectory = 10, bonds = 10, species = 10, thermo = 10 }}
"#,
            dir.path().display()
        ))
        .unwrap();
        (dir, meta)
    }

    #[test]
    fn file_names_follow_template() {
        assert_eq!(
            DataKind::Trajectory.file_name("prelim", 3),
            "dat_trajectory_prelim_3.dump"
        );
        assert_eq!(
            DataKind::Bonds.file_name("prelim", 0),
            "dat_bonds_prelim_0.reaxff"
        );
        assert_eq!(
            DataKind::Species.file_name("prelim", 1),
            "dat_species_prelim_1.out"
        );
        assert_eq!(DataKind::Thermo.file_name("prelim", 2), "log_out_prelim_2");
    }

    #[test]
    fn resolves_all_chunks_by_default() {
        let (_dir, meta) = fixture(3);
        let paths = resolve_chunk_paths(&meta, None, DataKind::Bonds, None).unwrap();
        assert_eq!(paths.len(), 3);
        for (chunk, path) in paths.iter().enumerate() {
            assert!(path.ends_with(format!("{chunk}/dat_bonds_prelim_{chunk}.reaxff")));
        }
    }

    #[test]
    fn rejects_out_of_range_chunk() {
        let (_dir, meta) = fixture(2);
        let err = resolve_chunk_paths(&meta, None, DataKind::Trajectory, Some(&[0, 2]))
            .expect_err("chunk 2 of 2 must fail");
        assert!(matches!(
            err,
            IngestError::InvalidChunks {
                requested: 2,
                n_chunks: 2
            }
        ));
    }

    #[test]
    fn reports_missing_file_with_path() {
        let (dir, meta) = fixture(2);
        let victim = dir.path().join("1").join("dat_species_prelim_1.out");
        fs::remove_file(&victim).unwrap();
        let err = resolve_chunk_paths(&meta, None, DataKind::Species, Some(&[1]))
            .expect_err("deleted file must fail");
        assert!(matches!(err, IngestError::FileNotFound(p) if p == victim));
    }

    proptest! {
        // Any in-range chunk set resolves to exactly |C| paths in request
        // order; any out-of-range member fails with InvalidChunks.
        #[test]
        fn chunk_set_cardinality(set in proptest::collection::vec(0usize..6, 0..8)) {
            let (_dir, meta) = fixture(4);
            let result = resolve_chunk_paths(&meta, None, DataKind::Thermo, Some(&set));
            if let Some(&bad) = set.iter().find(|&&c| c >= 4) {
                let err = result.expect_err("out-of-range chunk must fail");
                let matched = matches!(
                    err,
                    IngestError::InvalidChunks { requested, n_chunks: 4 } if requested == bad
                );
                prop_assert!(matched);
            } else {
                let paths = result.expect("in-range set must resolve");
                prop_assert_eq!(paths.len(), set.len());
                for (chunk, path) in set.iter().zip(&paths) {
                    let suffix = format!("{chunk}/log_out_prelim_{chunk}");
                    let ok = path.ends_with(&suffix);
                    prop_assert!(ok, "unexpected path {:?}", path);
                }
            }
        }
    }
}
