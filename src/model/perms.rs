use bitflags::bitflags;

bitflags! {
    /// Characteristic permission bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Perms: u8 {
        const PAIRED_READ = 1;
        const PAIRED_WRITE = 2;
        const EVENTS = 4;
        const ADDITIONAL_AUTH = 8;
        const TIMED_WRITE = 16;
        const HIDDEN = 32;
        const WRITE_RESPONSE = 64;
    }
}

const TAGS: [(Perms, &str); 7] = [
    (Perms::PAIRED_READ, "pr"),
    (Perms::PAIRED_WRITE, "pw"),
    (Perms::EVENTS, "ev"),
    (Perms::ADDITIONAL_AUTH, "aa"),
    (Perms::TIMED_WRITE, "tw"),
    (Perms::HIDDEN, "hd"),
    (Perms::WRITE_RESPONSE, "wr"),
];

impl Perms {
    pub const READ: Perms = Perms::PAIRED_READ;
    pub const READ_NOTIFY: Perms = Perms::PAIRED_READ.union(Perms::EVENTS);
    pub const READ_WRITE_NOTIFY: Perms = Perms::PAIRED_READ
        .union(Perms::PAIRED_WRITE)
        .union(Perms::EVENTS);
    pub const WRITE: Perms = Perms::PAIRED_WRITE;

    /// Short tags in bit order, as rendered in attribute payloads
    pub fn tags(&self) -> Vec<&'static str> {
        TAGS.iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, tag)| *tag)
            .collect()
    }
}
