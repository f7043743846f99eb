use super::models::{Playlist, Track};

/// A catalog record created by a user.
pub trait Owned {
    fn owner_id(&self) -> usize;
}

impl Owned for Track {
    fn owner_id(&self) -> usize {
        self.uploaded_by_user
    }
}

impl Owned for Playlist {
    fn owner_id(&self) -> usize {
        self.created_by_user
    }
}

/// Whether `actor` may mutate `resource`. Callers look the resource up first,
/// a missing resource is reported as such before ownership is considered.
pub fn is_owner<R: Owned>(actor: usize, resource: &R) -> bool {
    resource.owner_id() == actor
}
