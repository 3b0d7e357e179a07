use anyhow::{Context, Result};
use rezkrypt_models::{
    CompanyForm, FieldSpec, FormState, PortalEvent, PortalState, StudentForm,
};
use serde_json::json;

use crate::cli::PortalArgs;

/// Feed `key=value` edits through the update cycle, stopping at the first
/// one the active form rejects.
pub fn apply_edits(state: PortalState, edits: &[(String, String)]) -> Result<PortalState> {
    edits.iter().try_fold(state, |state, (key, raw)| {
        let event = state
            .edit_active(key, raw)
            .with_context(|| format!("invalid edit {key}={raw}"))?;
        state
            .update(event)
            .with_context(|| format!("invalid edit {key}={raw}"))
    })
}

fn active_fields(state: &PortalState) -> &'static [FieldSpec] {
    if state.mode.is_company() {
        CompanyForm::FIELDS
    } else {
        StudentForm::FIELDS
    }
}

/// `rezkrypt portal`
pub fn run(args: PortalArgs) -> Result<()> {
    let state = PortalState::default()
        .update(PortalEvent::SetCompanyMode(args.company))?;

    let output = if args.fields {
        json!({
            "mode": state.mode,
            "fields": active_fields(&state),
        })
    } else {
        let state = apply_edits(state, &args.edits)?;
        tracing::debug!(mode = ?state.mode, edits = args.edits.len(), "portal state updated");
        json!({
            "tagline": state.tagline(),
            "state": state,
        })
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
