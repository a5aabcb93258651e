//! # Resource Specs
//!
//! Immutable description of one desired remote resource, built fresh for every
//! invocation from the current desired-state input.

/// Desired state of a single remote resource
pub trait ResourceSpec: Send + Sync {
    /// Observed object type this spec interprets
    type Object;
    /// Request body produced when drift is detected
    type Parameters;

    /// Name of the remote resource
    ///
    /// May be empty: that is a configuration anomaly which is reported but does not
    /// stop reconciliation.
    fn resource_name(&self) -> &str;

    /// Parent or scope the resource lives under
    fn owner_resource_name(&self) -> &str;

    fn resource_group_name(&self) -> &str;

    /// Compute the request for the observed state
    ///
    /// `Ok(None)` means the resource is already in the desired state and no remote
    /// mutation is needed. An error is treated as terminal.
    fn parameters(&self, existing: Option<&Self::Object>) -> anyhow::Result<Option<Self::Parameters>>;
}

/// Supplies the ordered specs for one resource kind; may legitimately be empty
pub trait SpecProvider<S>: Send + Sync {
    fn specs(&self) -> Vec<S>;
}

impl<S, F> SpecProvider<S> for F
where
    F: Fn() -> Vec<S> + Send + Sync,
{
    fn specs(&self) -> Vec<S> {
        self()
    }
}
