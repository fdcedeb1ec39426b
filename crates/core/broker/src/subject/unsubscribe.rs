use std::sync::Weak;

/// Something a registration can be removed from.
pub(crate) trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

/// Handle returned by a subscription which removes the handler again.
///
/// Dropping the handle leaves the handler subscribed.
#[must_use = "dropping an Unsubscribe leaves the handler subscribed forever"]
pub struct Unsubscribe {
    registrations: Vec<(Weak<dyn Detach>, u64)>,
}

impl Unsubscribe {
    pub(crate) fn new(listeners: Weak<dyn Detach>, id: u64) -> Self {
        Self {
            registrations: vec![(listeners, id)],
        }
    }

    /// Combine several handles into one that removes all of them
    pub(crate) fn all<I: IntoIterator<Item = Unsubscribe>>(handles: I) -> Self {
        Self {
            registrations: handles
                .into_iter()
                .flat_map(|handle| handle.registrations)
                .collect(),
        }
    }

    /// Remove the handler, calling this again does nothing
    pub fn unsubscribe(&self) {
        for (listeners, id) in &self.registrations {
            if let Some(listeners) = listeners.upgrade() {
                listeners.detach(*id);
            }
        }
    }
}
