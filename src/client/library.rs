use crate::media::dto::{MediaResource, ResourceType};

/// Keep only the resources of one kind, preserving order.
pub fn filter_by_type(items: &[MediaResource], kind: ResourceType) -> Vec<&MediaResource> {
    items.iter().filter(|m| m.resource_type == kind).collect()
}

/// `512 B`, `1.5 KB`, `12.0 MB`
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// `m:ss`; empty when the duration is unknown or zero.
pub fn format_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s > 0.0 => {
            let total = s.floor() as u64;
            format!("{}:{:02}", total / 60, total % 60)
        }
        _ => String::new(),
    }
}
