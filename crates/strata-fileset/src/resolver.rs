use strata_store::Metadata;
use strata_types::FilesetId;

use crate::error::{FilesetError, FilesetResult};
use crate::storage::Storage;

impl Storage {
    /// Expand `ids` into the primitive layers they resolve to.
    ///
    /// Composites are expanded in place, depth first, keeping their own
    /// order, so the output follows the order references were given in.
    pub fn flatten(&self, ids: &[FilesetId]) -> FilesetResult<Vec<FilesetId>> {
        let mut flat = Vec::with_capacity(ids.len());
        for id in ids {
            self.flatten_into(id, &mut flat)?;
        }
        Ok(flat)
    }

    fn flatten_into(&self, id: &FilesetId, out: &mut Vec<FilesetId>) -> FilesetResult<()> {
        match self.get(id)? {
            Metadata::Primitive(_) => out.push(*id),
            Metadata::Composite(composite) => {
                for child in composite.points_to()? {
                    self.flatten_into(&child, out)?;
                }
            }
            Metadata::Empty => {
                return Err(FilesetError::EmptyFileset {
                    op: "Flatten",
                    id: *id,
                })
            }
        }
        Ok(())
    }
}
