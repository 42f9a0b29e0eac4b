//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, DynamicValue};

/// Sets the import ID to a specific attribute in state
///
/// This is useful for simple resources where the import ID maps directly to
/// a single attribute in the resource state. Read then populates the rest.
///
/// Example: ID "9b1f..." -> state.id = "9b1f..."
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::empty_object();

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(crate::types::Diagnostic {
            severity: crate::types::DiagnosticSeverity::Error,
            summary: format!("Failed to set import ID: {}", e),
            detail: format!(
                "Could not set attribute '{:?}' to value '{}'",
                attr_path, request.id
            ),
            attribute: Some(attr_path),
        });
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;

    #[test]
    fn passthrough_sets_id_attribute() {
        let ctx = Context::new();
        let request = ImportResourceStateRequest {
            type_name: "genesyscloud_speechandtextanalytics_program".to_string(),
            id: "prog-123".to_string(),
            client_capabilities: ClientCapabilities::default(),
        };
        let mut response = ImportResourceStateResponse {
            imported_resources: Vec::new(),
            diagnostics: Vec::new(),
            deferred: None,
        };

        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        let imported = &response.imported_resources[0];
        assert_eq!(
            imported.state.get_string(&AttributePath::new("id")).unwrap(),
            "prog-123"
        );
    }
}
