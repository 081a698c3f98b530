//! Topic naming rules for outbound publications

/// Suffix marking an outbound topic as a retained publication
pub const RETAINED_SUFFIX: &str = "/#";

/// Checks whether `topic` may be used as a publication target
///
/// - `$`-prefixed topics are reserved (e.g. the connectivity topic)
/// - `+` is never allowed
/// - `#` is only allowed as the last character, in the form `/#`,
///   where it flags a retained publication
pub fn is_valid_topic_name(topic: &str) -> bool {
    if topic.starts_with('$') {
        return false;
    }

    if topic.contains('+') {
        return false;
    }

    match topic.find('#') {
        None => true,
        Some(idx) if idx < topic.len() - 1 => false,
        Some(_) => topic.ends_with(RETAINED_SUFFIX),
    }
}

/// Broker topic and retained flag derived from a bus topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishTarget<'a> {
    pub topic: &'a str,
    pub retained: bool,
}

impl<'a> PublishTarget<'a> {
    /// Strips a trailing `/#` and marks the target retained
    pub fn parse(topic: &'a str) -> Self {
        match topic.strip_suffix(RETAINED_SUFFIX) {
            Some(stripped) => Self {
                topic: stripped,
                retained: true,
            },
            None => Self {
                topic,
                retained: false,
            },
        }
    }
}
