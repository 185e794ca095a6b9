use hive2hive_auth::OwnerKey;
use hive2hive_base::{kind_err, Kind, Result};
use hive2hive_model::{FileIndex, FileKey, Path};
use std::sync::Mutex;

/// Read permission granted to a share recipient (top-level spec §4.4,
/// `share(folder, userId, permission)`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Permission {
    Read,
    Write,
}

#[derive(Default)]
struct Fields {
    file_key: Option<FileKey>,
    path: Option<Path>,
    destination: Option<Path>,
    index: Option<FileIndex>,
    chunks: Option<Vec<FileKey>>,
    share_user: Option<OwnerKey>,
    share_permission: Option<Permission>,
    file_list: Option<Vec<Path>>,
}

/// Per-operation typed record threaded by reference through every step of
/// one pipeline (top-level spec §3, "Context"). Each field transitions
/// monotonically from unset to set exactly once during the forward pass;
/// `clear_*` undoes that during rollback. One `Context` is created by the
/// factory per user-visible operation and lives exactly as long as its root
/// composite.
#[derive(Default)]
pub struct Context {
    fields: Mutex<Fields>,
}

macro_rules! field_accessors {
    ($get:ident, $set:ident, $clear:ident, $field:ident, $ty:ty) => {
        pub fn $get(&self) -> Option<$ty> {
            self.fields.lock().unwrap().$field.clone()
        }

        pub fn $set(&self, value: $ty) -> Result<()> {
            let mut fields = self.fields.lock().unwrap();
            if fields.$field.is_some() {
                return Err(kind_err(
                    Kind::InvalidState,
                    concat!(stringify!($field), " already set in this context"),
                ));
            }
            fields.$field = Some(value);
            Ok(())
        }

        pub fn $clear(&self) {
            self.fields.lock().unwrap().$field = None;
        }
    };
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    field_accessors!(file_key, set_file_key, clear_file_key, file_key, FileKey);
    field_accessors!(path, set_path, clear_path, path, Path);
    field_accessors!(
        destination,
        set_destination,
        clear_destination,
        destination,
        Path
    );
    field_accessors!(index, set_index, clear_index, index, FileIndex);
    field_accessors!(chunks, set_chunks, clear_chunks, chunks, Vec<FileKey>);
    field_accessors!(
        share_user,
        set_share_user,
        clear_share_user,
        share_user,
        OwnerKey
    );
    field_accessors!(
        share_permission,
        set_share_permission,
        clear_share_permission,
        share_permission,
        Permission
    );
    field_accessors!(file_list, set_file_list, clear_file_list, file_list, Vec<Path>);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn setting_a_field_twice_is_invalid_state() {
        let ctx = Context::new();
        ctx.set_path(Path::root()).unwrap();
        let err = ctx.set_path(Path::root()).unwrap_err();
        assert_eq!(err.kind(), Kind::InvalidState);
    }

    #[test]
    fn clear_allows_resetting_after_rollback() {
        let ctx = Context::new();
        ctx.set_path(Path::root()).unwrap();
        ctx.clear_path();
        assert!(ctx.set_path(Path::root()).is_ok());
    }
}
