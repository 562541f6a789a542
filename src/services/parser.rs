use super::error::ScanError;
use crate::models::{CliOutput, DuplicateGroup};

/// Decode and validate the engine's JSON report.
///
/// This is a straight mapping: group and file order are kept as emitted,
/// paths are not normalized and nothing is deduplicated. The report is
/// rejected when it is not JSON, when required fields are missing or
/// mistyped, or when it breaks an invariant a consumer relies on.
pub fn parse_output(raw: &str) -> Result<CliOutput, ScanError> {
    let output: CliOutput = serde_json::from_str(raw).map_err(|e| {
        tracing::warn!("Engine output failed to decode: {}", e);
        ScanError::parse(e.to_string())
    })?;

    validate(&output)?;

    tracing::debug!(
        "Parsed report v{}: {} groups, {} bytes recoverable",
        output.version,
        output.duplicates.len(),
        output.total_space
    );

    Ok(output)
}

/// Check the invariants of a decoded report.
///
/// Group membership, the group count and similarity range are always
/// enforced. Size equality and the recoverable-space total only hold for
/// exact (hash) matching; in perceptual mode members of a group may differ
/// in size, so mismatches there are logged instead.
pub fn validate(output: &CliOutput) -> Result<(), ScanError> {
    let group_count = output.duplicates.len() as u64;
    if output.duplicate_count != group_count {
        return Err(ScanError::parse(format!(
            "duplicate_count is {} but {} groups were reported",
            output.duplicate_count, group_count
        )));
    }

    let exact = !output.config.perceptual_mode;
    let mut recoverable: u64 = 0;

    for (index, group) in output.duplicates.iter().enumerate() {
        validate_group(index, group, exact)?;

        let extra = (group.files.len() - 1) as u64;
        recoverable = group
            .size
            .checked_mul(extra)
            .and_then(|bytes| recoverable.checked_add(bytes))
            .ok_or_else(|| ScanError::parse("recoverable space overflows 64 bits"))?;
    }

    if recoverable != output.total_space {
        if exact {
            return Err(ScanError::parse(format!(
                "total_space is {} but groups add up to {}",
                output.total_space, recoverable
            )));
        }
        tracing::debug!(
            "Perceptual report total_space {} differs from group sum {}",
            output.total_space,
            recoverable
        );
    }

    Ok(())
}

fn validate_group(index: usize, group: &DuplicateGroup, exact: bool) -> Result<(), ScanError> {
    if group.files.len() < 2 {
        return Err(ScanError::parse(format!(
            "group {} ({}) has {} file(s), at least 2 are required",
            index,
            group.hash,
            group.files.len()
        )));
    }

    if !(0.0..=100.0).contains(&group.similarity) {
        return Err(ScanError::parse(format!(
            "group {} similarity {} is outside 0-100",
            index, group.similarity
        )));
    }

    for file in &group.files {
        if file.size != group.size {
            if exact {
                return Err(ScanError::parse(format!(
                    "file {} is {} bytes but its group is {} bytes",
                    file.path, file.size, group.size
                )));
            }
            tracing::debug!(
                "Perceptual group {} member {} differs in size ({} vs {})",
                index,
                file.path,
                file.size,
                group.size
            );
        }
    }

    Ok(())
}
