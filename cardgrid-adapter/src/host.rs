use cardgrid::{ContentLoader, MarkHost, SurfaceHost, VisibilityObserver};

use crate::EventSink;

/// The full host surface a [`crate::Gallery`] drives.
///
/// Implemented automatically for any type that implements every host trait.
pub trait GalleryHost<K>:
    SurfaceHost<K> + MarkHost<K> + VisibilityObserver<K> + ContentLoader<K> + EventSink<K>
{
}

impl<K, T> GalleryHost<K> for T where
    T: SurfaceHost<K> + MarkHost<K> + VisibilityObserver<K> + ContentLoader<K> + EventSink<K>
{
}
