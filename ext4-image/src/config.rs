use crate::error::Result;
use crate::fs::Ext4FileSystem;
use crate::traits::image_source::ImageSource;

/// Options applied when opening an image.
///
/// ```no_run
/// use ext4_image::OpenOptions;
///
/// let image = std::fs::File::open("disk.img")?;
/// let fs = OpenOptions::new().check_descriptors(true).open(image)?;
/// # Ok::<(), ext4_image::Ext4Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    /// Reject images with incompat feature bits this reader does not know.
    pub strict_features: bool,
    /// Resolve every group descriptor at open time and check that its
    /// inode table lies inside the filesystem.
    pub check_descriptors: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            strict_features: true,
            check_descriptors: false,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict_features(mut self, strict: bool) -> Self {
        self.strict_features = strict;
        self
    }

    pub fn check_descriptors(mut self, check: bool) -> Self {
        self.check_descriptors = check;
        self
    }

    /// Open `source` with these options.
    pub fn open<S: ImageSource>(&self, source: S) -> Result<Ext4FileSystem<S>> {
        Ext4FileSystem::open_with(source, self)
    }
}
