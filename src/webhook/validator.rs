//! # ArgoCD Validator
//!
//! Admission checks for `ArgoCD` resources. Only CREATE and UPDATE of
//! `ArgoCD` are inspected; everything else is allowed untouched.

use crate::controller::reconciler::validation::validate_sharding;
use crate::crd::ArgoCDSpec;
use crate::observability::metrics;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct ArgoCDValidator;

impl ArgoCDValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate a single admission request
    pub fn validate(&self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        let response = AdmissionResponse::from(request);
        if request.kind.kind != "ArgoCD"
            || !matches!(request.operation, Operation::Create | Operation::Update)
        {
            debug!(kind = %request.kind.kind, "Not an ArgoCD create or update, allowing");
            return response;
        }
        let Some(object) = request.object.as_ref() else {
            return response;
        };
        let spec = match object.data.get("spec") {
            Some(spec) => match serde_json::from_value::<ArgoCDSpec>(spec.clone()) {
                Ok(spec) => spec,
                Err(e) => return response.deny(format!("spec could not be parsed: {e}")),
            },
            None => ArgoCDSpec::default(),
        };
        match validate_sharding(&spec) {
            Ok(()) => response,
            Err(err) => {
                info!(
                    resource.name = %request.name,
                    resource.namespace = request.namespace.as_deref().unwrap_or(""),
                    "Denied ArgoCD: {}",
                    err
                );
                response.deny(err.to_string())
            }
        }
    }

    /// Turn a raw `AdmissionReview` body into the review sent back
    pub fn review(&self, body: &[u8]) -> AdmissionReview<DynamicObject> {
        let review: AdmissionReview<DynamicObject> = match serde_json::from_slice(body) {
            Ok(review) => review,
            Err(e) => {
                warn!(error = %e, "Malformed AdmissionReview");
                metrics::increment_webhook_admissions("invalid");
                return AdmissionResponse::invalid(e.to_string()).into_review();
            }
        };
        let request: AdmissionRequest<DynamicObject> = match review.try_into() {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "AdmissionReview without a request");
                metrics::increment_webhook_admissions("invalid");
                return AdmissionResponse::invalid(e.to_string()).into_review();
            }
        };
        let response = self.validate(&request);
        metrics::increment_webhook_admissions(if response.allowed { "allowed" } else { "denied" });
        response.into_review()
    }
}
