use napi::Result as NapiResult;
use napi_derive::napi;

use slab_tax_core::api;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Tax evaluation
// ---------------------------------------------------------------------------

#[napi]
pub fn evaluate_tax(input_json: String) -> NapiResult<String> {
    let input: api::TaxEvaluationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = api::evaluate_tax(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn default_schedule() -> NapiResult<String> {
    let table = slab_tax_core::SlabTable::india_new_regime();
    serde_json::to_string(&table).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Income records
// ---------------------------------------------------------------------------

#[napi]
pub fn assess_income(input_json: String) -> NapiResult<String> {
    let input: api::AssessmentInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = api::assess_income(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Deductions
// ---------------------------------------------------------------------------

#[napi]
pub fn optimize_deductions(input_json: String) -> NapiResult<String> {
    let input: api::DeductionInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = api::optimize_deductions(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
