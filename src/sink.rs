//! The storage collaborator: a sink that accepts entity records.

use std::io::Write;

use crate::entity::Entity;
use crate::error::Error;

/// External storage sink. The session guarantees at-most-once write-back
/// per accumulated entity; join records are stored immediately on creation.
pub trait EntitySink {
    fn store(&mut self, entity: &Entity) -> Result<(), Error>;
}

/// Writes one JSON object per line.
pub struct JsonlSink<W: Write> {
    writer: W,
    stored: u64,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, stored: 0 }
    }

    /// Number of entities written so far.
    #[must_use]
    pub fn stored(&self) -> u64 {
        self.stored
    }

    /// Flush and return the inner writer.
    pub fn finish(mut self) -> Result<W, Error> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> EntitySink for JsonlSink<W> {
    fn store(&mut self, entity: &Entity) -> Result<(), Error> {
        serde_json::to_writer(&mut self.writer, entity)
            .map_err(|e| Error::Store(e.to_string()))?;
        self.writer.write_all(b"\n")?;
        self.stored += 1;
        Ok(())
    }
}

/// Collects stored entities in memory, for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub entities: Vec<Entity>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored entities of the given class.
    #[must_use]
    pub fn of_class(&self, class: &str) -> Vec<&Entity> {
        self.entities.iter().filter(|e| e.class == class).collect()
    }
}

impl EntitySink for MemorySink {
    fn store(&mut self, entity: &Entity) -> Result<(), Error> {
        self.entities.push(entity.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;

    #[test]
    fn jsonl_one_object_per_line() {
        let mut sink = JsonlSink::new(Vec::new());
        let mut gene = Entity::new(EntityId(1), "Gene");
        gene.set_attribute("primaryIdentifier", "Foo");
        sink.store(&gene).unwrap();
        sink.store(&Entity::new(EntityId(2), "Organism")).unwrap();
        assert_eq!(sink.stored(), 2);

        let bytes = sink.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""class":"Gene""#));
        assert!(lines[1].contains(r#""class":"Organism""#));
    }

    #[test]
    fn memory_sink_filters_by_class() {
        let mut sink = MemorySink::new();
        sink.store(&Entity::new(EntityId(1), "Gene")).unwrap();
        sink.store(&Entity::new(EntityId(2), "Exon")).unwrap();
        sink.store(&Entity::new(EntityId(3), "Gene")).unwrap();
        assert_eq!(sink.of_class("Gene").len(), 2);
        assert_eq!(sink.of_class("Exon").len(), 1);
    }
}
