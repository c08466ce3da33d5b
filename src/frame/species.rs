//! Chemical species census parsing.
//!
//! A species record is a header/data line pair: the header names the species
//! observed at that timestep, the data line counts them. Header order is
//! preserved so downstream consumers see species in the engine's own order.

use indexmap::IndexMap;

use crate::ingest::error::IngestError;

// Header tokens before the species names, and data tokens before the counts.
const HEADER_RESERVED: usize = 2;
const DATA_RESERVED: usize = 3;

/// Species census at one timestep
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesFrame {
    /// Simulation step this census was written at
    pub timestep: i64,
    /// Total molecule count across all species
    pub no_moles: u64,
    /// Total number of distinct species
    pub no_species: u64,
    /// Per-species molecule counts, in header order
    pub species: IndexMap<String, u64>,
}

/// Parse one species segment (header line plus data line).
///
/// Header tokens 0 and 1 are reserved; the rest are species names. The data
/// line is `timestep no_moles no_species count...`, counts aligned
/// positionally with the names. Name/count arity mismatches and duplicate
/// names are rejected.
pub fn parse_species_segment(segment: &str) -> Result<SpeciesFrame, IngestError> {
    let mut lines = segment.lines().map(str::trim).filter(|l| !l.is_empty());

    let header = lines
        .next()
        .ok_or_else(|| IngestError::shape(None, "species segment is empty"))?;
    let data = lines
        .next()
        .ok_or_else(|| IngestError::shape(None, "species segment has no data line"))?;

    let header_tokens: Vec<&str> = header.split_whitespace().collect();
    if header_tokens.len() < HEADER_RESERVED {
        return Err(IngestError::shape(
            None,
            format!("species header has only {} tokens", header_tokens.len()),
        ));
    }
    let names = &header_tokens[HEADER_RESERVED..];

    let data_tokens: Vec<&str> = data.split_whitespace().collect();
    if data_tokens.len() < DATA_RESERVED {
        return Err(IngestError::shape(
            None,
            format!("species data line has only {} tokens", data_tokens.len()),
        ));
    }
    let timestep = data_tokens[0]
        .parse::<i64>()
        .map_err(|_| IngestError::int(data_tokens[0]))?;
    let no_moles = data_tokens[1]
        .parse::<u64>()
        .map_err(|_| IngestError::int(data_tokens[1]))?;
    let no_species = data_tokens[2]
        .parse::<u64>()
        .map_err(|_| IngestError::int(data_tokens[2]))?;
    let counts = &data_tokens[DATA_RESERVED..];

    if names.len() != counts.len() {
        return Err(IngestError::shape(
            Some(timestep),
            format!(
                "species header names {} species but the data line has {} counts",
                names.len(),
                counts.len()
            ),
        ));
    }

    let mut species = IndexMap::with_capacity(names.len());
    for (name, count) in names.iter().zip(counts) {
        let count = count.parse::<u64>().map_err(|_| IngestError::int(count))?;
        if species.insert(name.to_string(), count).is_some() {
            return Err(IngestError::shape(
                Some(timestep),
                format!("duplicate species name `{name}`"),
            ));
        }
    }

    Ok(SpeciesFrame {
        timestep,
        no_moles,
        no_species,
        species,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_census() {
        let frame = parse_species_segment("# id H2O NaCl\n100 50 2 30 20\n").unwrap();
        assert_eq!(frame.timestep, 100);
        assert_eq!(frame.no_moles, 50);
        assert_eq!(frame.no_species, 2);
        assert_eq!(frame.species.get("H2O"), Some(&30));
        assert_eq!(frame.species.get("NaCl"), Some(&20));
        // Header order survives.
        let names: Vec<&str> = frame.species.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["H2O", "NaCl"]);
    }

    #[test]
    fn rejects_arity_mismatch() {
        let err = parse_species_segment("# id H2O NaCl\n100 50 2 30\n")
            .expect_err("missing count must fail");
        assert!(matches!(err, IngestError::ParseShape { timestep: Some(100), .. }));
    }

    #[test]
    fn rejects_duplicate_species() {
        let err = parse_species_segment("# id H2O H2O\n100 50 1 30 20\n")
            .expect_err("duplicate name must fail");
        assert!(matches!(err, IngestError::ParseShape { .. }));
    }

    #[test]
    fn rejects_missing_data_line() {
        let err = parse_species_segment("# id H2O\n").expect_err("header alone must fail");
        assert!(matches!(err, IngestError::ParseShape { timestep: None, .. }));
    }

    #[test]
    fn empty_census_is_valid() {
        let frame = parse_species_segment("# id\n0 0 0\n").unwrap();
        assert_eq!(frame.timestep, 0);
        assert!(frame.species.is_empty());
    }
}
