use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// A source of class file byte streams, keyed by slash-delimited file
/// paths such as `java/lang/Object.class`.
///
/// The stream returned by [`Classpath::open`] is read exactly once by the
/// loader and dropped (closed) when the load finishes, whether it
/// succeeded or failed.
pub trait Classpath {
    /// Opens an input stream over the named file, or fails with an I/O
    /// error if it cannot be found or read.
    fn open<'a>(&'a self, path: &str) -> io::Result<Box<dyn Read + 'a>>;
}

/// A classpath rooted at a directory on the local file system.
pub struct DirClasspath {
    root: PathBuf,
}

impl DirClasspath {
    pub fn new<P: AsRef<Path>>(root: P) -> DirClasspath {
        DirClasspath {
            root: root.as_ref().into(),
        }
    }
}

impl Classpath for DirClasspath {
    fn open<'a>(&'a self, path: &str) -> io::Result<Box<dyn Read + 'a>> {
        let file = File::open(self.root.join(path))?;
        Ok(Box::new(file))
    }
}

/// An in-memory classpath holding class file images directly. Used when
/// hosting the loader in environments with no file system, and by tests.
#[derive(Default)]
pub struct MapClasspath {
    files: HashMap<String, Vec<u8>>,
}

impl MapClasspath {
    pub fn new() -> MapClasspath {
        MapClasspath::default()
    }

    /// Registers (or replaces) a class file image under a slash path.
    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(path.to_string(), bytes);
    }
}

impl Classpath for MapClasspath {
    fn open<'a>(&'a self, path: &str) -> io::Result<Box<dyn Read + 'a>> {
        match self.files.get(path) {
            Some(bytes) => Ok(Box::new(&bytes[..])),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("class file not found: {}", path),
            )),
        }
    }
}
