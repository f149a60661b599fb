//! NCBI taxonomy dump conversion.
//!
//! `names.dmp` rows use `\t|\t` as the field terminator and `\t|` at end of
//! row, so tabs are stripped before splitting on `|`:
//!
//! ```text
//! 3827	|	chickpea	|		|	genbank common name	|
//! 3827	|	Cicer arietinum	|		|	scientific name	|
//! ```
//!
//! Only tax IDs on the configured allow-list are retained. One Organism
//! entity is built per retained tax ID and stored at end of file.

use std::io::BufRead;

use indexmap::IndexMap;

use crate::entity::Entity;
use crate::error::Error;
use crate::session::ConversionSession;
use crate::sink::EntitySink;

/// Read `names.dmp` and store one Organism per allow-listed tax ID.
/// Returns the number of organisms stored.
pub fn process_taxonomy_dump<S: EntitySink, R: BufRead>(
    session: &mut ConversionSession<S>,
    reader: R,
    file_name: &str,
) -> Result<u64, Error> {
    let allow_list = session.config().taxonomy_allow_list();
    let mut organisms: IndexMap<String, Entity> = IndexMap::new();

    for (num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let stripped = line.replace('\t', "");
        let fields: Vec<&str> = stripped.split('|').collect();
        if fields.len() < 4 {
            return Err(Error::Parse(format!(
                "{file_name} line {}: expected 4 pipe-separated fields, found {}",
                num + 1,
                fields.len()
            )));
        }
        let tax_id = fields[0];
        let name_txt = fields[1];
        let name_class = fields[3];

        if !allow_list.iter().any(|id| id == tax_id) {
            continue;
        }

        if !organisms.contains_key(tax_id) {
            let id = session.allocate();
            let mut entity = Entity::new(id, "Organism");
            entity.set_attribute("taxonId", tax_id);
            organisms.insert(tax_id.to_string(), entity);
        }
        // allow-list membership checked just above
        let organism = organisms.get_mut(tax_id).unwrap();

        match name_class {
            "genbank common name" => {
                organism.set_attribute("commonName", name_txt);
            }
            "scientific name" => {
                organism.set_attribute("name", name_txt);
                let mut words = name_txt.split_whitespace();
                if let (Some(genus), Some(species)) = (words.next(), words.next()) {
                    organism
                        .set_attribute("genus", genus)
                        .set_attribute("species", species);
                    if let Some(initial) = genus.chars().next() {
                        organism.set_attribute("shortName", format!("{initial}. {species}"));
                    }
                }
            }
            // synonyms, authorities, misspellings
            _ => {}
        }
    }

    let stored = organisms.len() as u64;
    for (_, entity) in organisms {
        session.store(&entity)?;
    }
    log::info!("{file_name}: {stored} organisms stored");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceVariant;
    use crate::session::test_config;
    use crate::sink::MemorySink;
    use std::io::Cursor;

    const NAMES_DMP: &str = "\
3827\t|\tchickpea\t|\t\t|\tgenbank common name\t|
3827\t|\tCicer arietinum L.\t|\t\t|\tauthority\t|
3827\t|\tCicer arietinum\t|\t\t|\tscientific name\t|
3827\t|\tgarbanzo\t|\t\t|\tcommon name\t|
9606\t|\tHomo sapiens\t|\t\t|\tscientific name\t|
";

    fn run(taxon_ids: Vec<String>) -> MemorySink {
        let mut config = test_config(SourceVariant::Primary);
        config.taxon_ids = taxon_ids;
        let mut session = ConversionSession::new(config, MemorySink::new());
        process_taxonomy_dump(&mut session, Cursor::new(NAMES_DMP.as_bytes()), "names.dmp")
            .unwrap();
        session.into_sink()
    }

    #[test]
    fn scientific_name_derives_fields() {
        let sink = run(vec!["3827".to_string()]);
        let organisms = sink.of_class("Organism");
        assert_eq!(organisms.len(), 1);
        let o = &organisms[0];
        assert_eq!(o.attributes["taxonId"], "3827");
        assert_eq!(o.attributes["name"], "Cicer arietinum");
        assert_eq!(o.attributes["genus"], "Cicer");
        assert_eq!(o.attributes["species"], "arietinum");
        assert_eq!(o.attributes["shortName"], "C. arietinum");
        assert_eq!(o.attributes["commonName"], "chickpea");
        // plain "common name" and "authority" rows contribute nothing
        assert!(!o.attributes.values().any(|v| v == "garbanzo"));
    }

    #[test]
    fn allow_list_filters_tax_ids() {
        let sink = run(vec!["9606".to_string()]);
        let organisms = sink.of_class("Organism");
        assert_eq!(organisms.len(), 1);
        assert_eq!(organisms[0].attributes["taxonId"], "9606");
    }

    #[test]
    fn allow_list_defaults_to_run_taxon() {
        // empty taxon_ids falls back to the run's own taxon ID
        let sink = run(Vec::new());
        let organisms = sink.of_class("Organism");
        assert_eq!(organisms.len(), 1);
        assert_eq!(organisms[0].attributes["taxonId"], "3827");
    }

    #[test]
    fn short_rows_are_fatal() {
        let mut session = ConversionSession::new(
            test_config(SourceVariant::Primary),
            MemorySink::new(),
        );
        let err = process_taxonomy_dump(
            &mut session,
            Cursor::new(b"3827\t|\tchickpea\n".as_slice()),
            "names.dmp",
        )
        .unwrap_err();
        assert!(err.to_string().contains("fields"));
    }
}
