//! Favorites Manager.
//!
//! Favorites live in a flat file: one line with the title followed by one
//! line with the URI, repeated. Every mutation rewrites the whole file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::types::errors::FavoriteError;
use crate::types::favorite::Favorite;

/// Trait defining favorites operations.
pub trait FavoritesManagerTrait {
    fn load(&mut self) -> Result<usize, FavoriteError>;
    fn add(&mut self, title: &str, uri: &str) -> Result<usize, FavoriteError>;
    fn remove(&mut self, index: usize) -> Result<Favorite, FavoriteError>;
    fn list(&self) -> &[Favorite];
}

pub struct FavoritesManager {
    path: PathBuf,
    favorites: Vec<Favorite>,
}

impl FavoritesManager {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            favorites: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(content: &str) -> Vec<Favorite> {
        let mut out = Vec::new();
        let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
        while let Some(title) = lines.next() {
            match lines.next() {
                Some(uri) => out.push(Favorite {
                    title: title.to_string(),
                    uri: uri.to_string(),
                }),
                None => warn!("favorites: dangling title {:?} without uri", title),
            }
        }
        out
    }

    fn save(&self) -> Result<(), FavoriteError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = String::new();
        for f in &self.favorites {
            content.push_str(&f.title);
            content.push('\n');
            content.push_str(&f.uri);
            content.push('\n');
        }
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Titles are single-line; an empty title falls back to the URI.
    fn clean_title(title: &str, uri: &str) -> String {
        let t = title.lines().next().unwrap_or("").trim();
        if t.is_empty() {
            uri.to_string()
        } else {
            t.to_string()
        }
    }
}

impl FavoritesManagerTrait for FavoritesManager {
    /// Reads the favorites file. A missing file means no favorites.
    fn load(&mut self) -> Result<usize, FavoriteError> {
        self.favorites = match fs::read_to_string(&self.path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(self.favorites.len())
    }

    /// Appends a favorite and returns its index.
    fn add(&mut self, title: &str, uri: &str) -> Result<usize, FavoriteError> {
        let uri = uri.trim();
        if uri.is_empty() || uri.contains('\n') {
            return Err(FavoriteError::Invalid(format!("bad uri {:?}", uri)));
        }
        self.favorites.push(Favorite {
            title: Self::clean_title(title, uri),
            uri: uri.to_string(),
        });
        self.save()?;
        info!("favorite added: {}", uri);
        Ok(self.favorites.len() - 1)
    }

    fn remove(&mut self, index: usize) -> Result<Favorite, FavoriteError> {
        if index >= self.favorites.len() {
            return Err(FavoriteError::NotFound(index));
        }
        let removed = self.favorites.remove(index);
        self.save()?;
        Ok(removed)
    }

    fn list(&self) -> &[Favorite] {
        &self.favorites
    }
}
