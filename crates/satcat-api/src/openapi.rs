//! `OpenAPI` (3.1) specification generation for `satcat-api`.
//!
//! Served at `/openapi.json` and written to stdout by `gen_openapi`.

use utoipa::OpenApi;

/// `OpenAPI` documentation for the satcat REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Satcat API",
        description = "Satellite component catalog: hierarchical bill of materials"
    ),
    paths(
        crate::routes::components::create_component,
        crate::routes::components::list_components,
        crate::routes::components::get_component,
        crate::routes::components::update_component,
        crate::routes::components::delete_component,
        crate::routes::components::component_tree,
        crate::routes::components::component_forest,
        crate::routes::components::seed_components,
        crate::routes::components::export_components,
        crate::routes::subsystems::create_subsystem,
        crate::routes::subsystems::list_subsystems,
        crate::routes::subsystems::delete_subsystem,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::components::MakeBuyCode,
            crate::routes::components::CreateComponentRequest,
            crate::routes::components::UpdateComponentRequest,
            crate::routes::components::ComponentResponse,
            crate::routes::components::ComponentTreeResponse,
            crate::routes::components::SubsystemResponse,
            crate::routes::subsystems::CreateSubsystemRequest,
        )
    ),
    tags(
        (name = "components", description = "Component and hierarchy operations"),
        (name = "subsystems", description = "Subsystem operations"),
    ),
)]
pub struct ApiDoc;

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Returns the generated `OpenAPI` spec as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn openapi_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lists_every_catalog_path() -> Result<(), serde_json::Error> {
        let json: serde_json::Value = serde_json::from_str(&openapi_json()?)?;
        let paths = json["paths"].as_object().map(|p| p.len()).unwrap_or_default();
        assert_eq!(paths, 8);
        for path in [
            "/components",
            "/components/{id}",
            "/components/{id}/tree",
            "/components/tree",
            "/components/seed",
            "/components/export/excel",
            "/subsystems",
            "/subsystems/{id}",
        ] {
            assert!(json["paths"].get(path).is_some(), "missing {path}");
        }
        Ok(())
    }
}
