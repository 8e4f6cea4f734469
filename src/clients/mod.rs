pub mod qbittorrent;
pub mod torznab;
