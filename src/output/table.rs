use crate::domain::AccessRecord;
use crate::error::Result;

pub const COLUMNS: [&str; 15] = [
    "User",
    "User Email",
    "User Status",
    "Responsible Group",
    "Assignment Type",
    "AWS Account",
    "Account ID",
    "Account Classification",
    "Role Name",
    "Access Level",
    "Read Score",
    "Write Score",
    "Admin Score",
    "Risk Level",
    "Justification",
];

/// Indexes of the numeric score columns.
pub(crate) const SCORE_COLUMNS: [usize; 3] = [10, 11, 12];

/// Cell values of one report row, in [`COLUMNS`] order.
#[must_use]
pub fn row_values(record: &AccessRecord) -> [String; 15] {
    let scores = &record.role.scores;
    [
        record.user.name().to_string(),
        record.user.email.clone(),
        record.user.status.to_string(),
        record.responsible_group.clone(),
        record.assignment_type.to_string(),
        record.account.name.clone(),
        record.account.id.clone(),
        record.account.classification.clone(),
        record.role.name.clone(),
        record.effective_access().to_string(),
        scores.read_score.to_string(),
        scores.write_score.to_string(),
        scores.admin_score.to_string(),
        record.role.risk_level().to_string(),
        scores.justification.clone(),
    ]
}

pub fn format_csv(records: &[AccessRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(COLUMNS)?;
    for record in records {
        wtr.write_record(row_values(record))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
