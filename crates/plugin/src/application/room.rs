//! Room id parsing.
//!
//! The host exposes the room as `<protocol>~/<folder>/<office>/...`; the
//! backend wants the folder and office names.

/// Folder and office names extracted from a host room id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomLocation {
    pub folder: String,
    pub office: String,
}

impl RoomLocation {
    /// Parse a host room id, e.g.
    /// `https://play.example.com/_/global~/acme/hq/office.tmj`.
    pub fn parse(room_id: &str) -> Option<Self> {
        let (_, path) = room_id.split_once('~')?;
        let segments: Vec<&str> = path.split('/').collect();
        let folder = segments.get(1).copied().filter(|s| !s.is_empty())?;
        let office = segments.get(2).copied().filter(|s| !s.is_empty())?;
        Some(Self {
            folder: folder.to_string(),
            office: office.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_folder_and_office() {
        let location =
            RoomLocation::parse("https://play.example.com/_/global~/acme/hq/office.tmj")
                .expect("valid id");
        assert_eq!(location.folder, "acme");
        assert_eq!(location.office, "hq");
    }

    #[test]
    fn rejects_ids_without_a_protocol_separator() {
        assert_eq!(RoomLocation::parse("/acme/hq/office.tmj"), None);
    }

    #[test]
    fn rejects_truncated_paths() {
        assert_eq!(RoomLocation::parse("proto~/acme"), None);
        assert_eq!(RoomLocation::parse("proto~/"), None);
        assert_eq!(RoomLocation::parse("proto~"), None);
    }
}
