//! Demo content for an empty catalog.

use super::models::{NewAlbum, NewSong, Price};
use super::writer::CatalogWriter;
use super::CatalogReader;
use anyhow::{Context, Result};
use tracing::info;

struct DemoAlbum {
    title: &'static str,
    artist: &'static str,
    price_cents: i64,
    quantity: i64,
    songs: &'static [&'static str],
}

const DEMO_ALBUMS: &[DemoAlbum] = &[
    DemoAlbum {
        title: "Blue Train",
        artist: "John Coltrane",
        price_cents: 5699,
        quantity: 5,
        songs: &["Blue Train", "Moment's Notice", "Locomotion"],
    },
    DemoAlbum {
        title: "Giant Steps",
        artist: "John Coltrane",
        price_cents: 6399,
        quantity: 3,
        songs: &["Giant Steps", "Naima"],
    },
    DemoAlbum {
        title: "Jeru",
        artist: "Gerry Mulligan",
        price_cents: 1799,
        quantity: 2,
        songs: &["Capricious", "Here I'll Stay"],
    },
    DemoAlbum {
        title: "Sarah Vaughan",
        artist: "Sarah Vaughan",
        price_cents: 3498,
        quantity: 4,
        songs: &["Lullaby of Birdland", "April in Paris"],
    },
    DemoAlbum {
        title: "Marshal Matters",
        artist: "Eminem",
        price_cents: 2500,
        quantity: 6,
        songs: &["Stan", "The Way I Am"],
    },
];

/// Loads the demo albums and songs, unless the catalog already has albums.
/// Returns the number of albums inserted.
pub fn seed_demo_catalog(reader: &CatalogReader, writer: &CatalogWriter) -> Result<usize> {
    let (albums, _songs) = reader
        .get_combined()
        .context("Failed to inspect catalog before seeding")?;
    if !albums.is_empty() {
        info!(
            "Catalog already has {} albums, skipping demo seed",
            albums.len()
        );
        return Ok(0);
    }

    for demo in DEMO_ALBUMS {
        let album_id = writer
            .add_album(&NewAlbum {
                title: demo.title.to_string(),
                artist: demo.artist.to_string(),
                price: Price::from_cents(demo.price_cents),
                quantity: demo.quantity,
            })
            .with_context(|| format!("Failed to seed album '{}'", demo.title))?;

        for song in demo.songs {
            writer
                .add_song(&NewSong {
                    name: song.to_string(),
                    album_id,
                })
                .with_context(|| format!("Failed to seed song '{}'", song))?;
        }
    }

    info!("Seeded demo catalog with {} albums", DEMO_ALBUMS.len());
    Ok(DEMO_ALBUMS.len())
}
