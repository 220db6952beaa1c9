//! Sticker gallery served from `<static>/stickers/<category>/`.

use std::{fs, io, path::Path};

use serde::Serialize;

use crate::{
    error::AppError,
    models::StickerFavorites,
    store::{keys, Storage},
};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub key: &'static str,
    pub label: &'static str,
}

pub const CATEGORIES: [Category; 7] = [
    Category { key: "barbearia", label: "Barbearia" },
    Category { key: "bom_dia", label: "Bom dia" },
    Category { key: "boa_tarde", label: "Boa tarde" },
    Category { key: "boa_noite", label: "Boa noite" },
    Category { key: "frases", label: "Frases" },
    Category { key: "favela", label: "Favela" },
    Category { key: "animadas", label: "Animadas" },
];

pub fn category(key: &str) -> Option<Category> {
    CATEGORIES.into_iter().find(|category| category.key == key)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sticker {
    pub name: String,
    pub url: String,
    pub favorite: bool,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Image files of one category, sorted by name. A missing directory is an
/// empty category.
pub fn list(static_dir: &Path, category: Category, favorites: &StickerFavorites) -> io::Result<Vec<Sticker>> {
    let dir = static_dir.join("stickers").join(category.key);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log::debug!("No sticker directory at {}", dir.display());
            return Ok(Vec::new());
        }
        Err(err) => return Err(err),
    };

    let mut names = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || !is_image(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();

    Ok(names
        .into_iter()
        .map(|name| {
            let url = format!("/static/stickers/{}/{}", category.key, urlencoding::encode(&name));
            Sticker {
                favorite: favorites.0.contains(&url),
                name,
                url,
            }
        })
        .collect())
}

/// Adds or removes `url` from the favorites. Returns whether it is now a
/// favorite.
pub async fn toggle_favorite(storage: &Storage, url: &str) -> Result<bool, AppError> {
    let url = url.trim();
    if !url.starts_with("/static/stickers/") {
        return Err(AppError::validation("Figurinha inválida."));
    }
    let session = storage.session().await;
    let mut favorites: StickerFavorites = session.document().await?;
    let now_favorite = match favorites.0.iter().position(|existing| existing == url) {
        Some(index) => {
            favorites.0.remove(index);
            false
        }
        None => {
            favorites.0.push(url.to_string());
            true
        }
    };
    session.put_document(&favorites).await?;
    Ok(now_favorite)
}

pub async fn clear_favorites(storage: &Storage) -> Result<(), AppError> {
    storage.clear(keys::STICKER_FAVORITES).await?;
    log::info!("Sticker favorites cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc};

    use super::*;
    use crate::store::MemoryStore;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            let path = std::env::temp_dir().join(format!("stickers-{}", uuid::Uuid::new_v4()));
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn lists_images_sorted_and_encoded() {
        let root = TempDir::new();
        let dir = root.0.join("stickers").join("bom_dia");
        fs::create_dir_all(&dir).unwrap();
        for name in ["b.png", "a café.JPG", "notes.txt"] {
            fs::write(dir.join(name), b"x").unwrap();
        }
        fs::create_dir_all(dir.join("nested.png")).unwrap();

        let favorites = StickerFavorites(vec!["/static/stickers/bom_dia/b.png".into()]);
        let stickers = list(&root.0, category("bom_dia").unwrap(), &favorites).unwrap();
        let names: Vec<&str> = stickers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a café.JPG", "b.png"]);
        assert_eq!(stickers[0].url, "/static/stickers/bom_dia/a%20caf%C3%A9.JPG");
        assert!(!stickers[0].favorite);
        assert!(stickers[1].favorite);
    }

    #[test]
    fn missing_category_directory_is_empty() {
        let root = TempDir::new();
        let stickers = list(&root.0, CATEGORIES[6], &StickerFavorites::default()).unwrap();
        assert!(stickers.is_empty());
        assert!(category("memes").is_none());
    }

    #[actix_web::test]
    async fn favorites_toggle_and_clear() {
        let storage = Storage::new(Arc::new(MemoryStore::default()));
        let url = "/static/stickers/frases/um.png";
        assert!(toggle_favorite(&storage, url).await.unwrap());
        let favorites: StickerFavorites = storage.document().await.unwrap();
        assert_eq!(favorites.0, vec![url.to_string()]);

        assert!(!toggle_favorite(&storage, url).await.unwrap());
        assert!(toggle_favorite(&storage, url).await.unwrap());
        clear_favorites(&storage).await.unwrap();
        let favorites: StickerFavorites = storage.document().await.unwrap();
        assert!(favorites.0.is_empty());

        assert!(toggle_favorite(&storage, "https://evil.example/x.png").await.is_err());
    }
}
