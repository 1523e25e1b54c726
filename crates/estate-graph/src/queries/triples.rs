//! Triple extraction for knowledge-graph embeddings.

use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use neo4rs::Query;
use serde::{Deserialize, Serialize};

use crate::GraphClient;

/// Relationship types that become embedding triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmbeddingRelation {
    #[serde(rename = "LOCATED_IN")]
    LocatedIn,
    #[serde(rename = "IN_PRICE_RANGE")]
    InPriceRange,
    #[serde(rename = "OWNED_BY")]
    OwnedBy,
}

impl EmbeddingRelation {
    pub const ALL: [EmbeddingRelation; 3] = [Self::LocatedIn, Self::InPriceRange, Self::OwnedBy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocatedIn => "LOCATED_IN",
            Self::InPriceRange => "IN_PRICE_RANGE",
            Self::OwnedBy => "OWNED_BY",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "LOCATED_IN" => Ok(Self::LocatedIn),
            "IN_PRICE_RANGE" => Ok(Self::InPriceRange),
            "OWNED_BY" => Ok(Self::OwnedBy),
            _ => anyhow::bail!("Invalid relation: '{}'. Use: LOCATED_IN, IN_PRICE_RANGE, OWNED_BY", s),
        }
    }
}

/// A labeled (subject, predicate, object) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// Extract apartment triples for the three embedding relations. Objects are
/// stringified (postal codes become text).
pub async fn embedding_triples(client: &GraphClient) -> Result<Vec<Triple>> {
    let query = Query::new(
        "MATCH (a:Apartment)-[:LOCATED_IN]->(d:District)
         RETURN a.id AS subject, 'LOCATED_IN' AS predicate, toString(d.postal_code) AS object
         UNION ALL
         MATCH (a:Apartment)-[:IN_PRICE_RANGE]->(p:PriceRange)
         RETURN a.id AS subject, 'IN_PRICE_RANGE' AS predicate, p.name AS object
         UNION ALL
         MATCH (a:Apartment)-[:OWNED_BY]->(o:Owner)
         RETURN a.id AS subject, 'OWNED_BY' AS predicate, o.name AS object"
            .to_string(),
    );

    let rows = client.query(query).await.context("Failed to extract embedding triples")?;
    let mut triples: Vec<Triple> = rows
        .into_iter()
        .filter_map(|row| {
            Some(Triple {
                subject: row.get("subject").ok()?,
                predicate: row.get("predicate").ok()?,
                object: row.get("object").ok()?,
            })
        })
        .collect();

    triples.sort_by(|a, b| {
        (&a.subject, &a.predicate, &a.object).cmp(&(&b.subject, &b.predicate, &b.object))
    });
    Ok(triples)
}

/// Escape the characters that would split a TSV field or line.
fn tsv_field(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Write triples as tab-separated `subject predicate object` lines.
/// Backslashes, tabs and line breaks inside labels are backslash-escaped.
pub fn write_tsv(triples: &[Triple], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "subject\tpredicate\tobject")?;
    for triple in triples {
        writeln!(
            writer,
            "{}\t{}\t{}",
            tsv_field(&triple.subject),
            tsv_field(&triple.predicate),
            tsv_field(&triple.object)
        )?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_parsing() {
        assert_eq!(EmbeddingRelation::from_str("owned-by").unwrap(), EmbeddingRelation::OwnedBy);
        assert_eq!(EmbeddingRelation::from_str("LOCATED_IN").unwrap(), EmbeddingRelation::LocatedIn);
        assert!(EmbeddingRelation::from_str("NEIGHBOR_OF").is_err());
    }

    #[test]
    fn test_write_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triples.tsv");
        let triples = vec![Triple {
            subject: "A2".into(),
            predicate: "LOCATED_IN".into(),
            object: "1010".into(),
        }];
        write_tsv(&triples, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "subject\tpredicate\tobject\nA2\tLOCATED_IN\t1010\n");
    }

    #[test]
    fn test_write_tsv_escapes_separators() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("triples.tsv");
        let triples = vec![Triple {
            subject: "A9".into(),
            predicate: "OWNED_BY".into(),
            object: "Wohnbau\tGmbH\nWien \\ Nord".into(),
        }];
        write_tsv(&triples, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].split('\t').count(), 3);
        assert_eq!(lines[1], "A9\tOWNED_BY\tWohnbau\\tGmbH\\nWien \\\\ Nord");
    }
}
