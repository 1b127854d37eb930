//! Reader for PubMed efetch XML (`PubmedArticleSet`).
//!
//! Parses the response with SAX-style events, tracking the element path
//! below each `<PubmedArticle>` so that identically named elements in
//! different places (a `<Title>` under `<Journal>` versus one in a book
//! reference, an `<ArticleId>` in the article's own id list versus one in
//! its reference list) are told apart.

use std::collections::BTreeMap;
use std::io::BufRead;

use quick_xml::encoding::Decoder;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};

use crate::PubMedError;

/// One `<PubmedArticle>`, keyed by its PMID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubMedArticle {
    pub pmid: String,
    /// Bibliographic part of the citation, absent when the record carries
    /// no `<Article>` element.
    pub article: Option<Article>,
    pub chemicals: Vec<Chemical>,
    pub mesh: Vec<MeshDescriptor>,
    pub related_ids: RelatedIds,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// `PubModel` attribute, e.g. `Print-Electronic`.
    pub pub_model: Option<String>,
    pub issn: Option<String>,
    pub journal_title: Option<String>,
    pub journal_iso_abbreviation: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub year: Option<String>,
    pub title: Option<String>,
    /// `MedlinePgn`, e.g. `1203-10`.
    pub page_range: Option<String>,
    pub authors: Vec<Author>,
    pub grants: Vec<Grant>,
    /// First `<AbstractText>` section.
    pub abstract_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub last_name: Option<String>,
    pub fore_name: Option<String>,
    pub initials: Option<String>,
    pub affiliations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grant_id: Option<String>,
    pub acronym: Option<String>,
    pub agency: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chemical {
    pub registry_number: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshDescriptor {
    pub term: Option<String>,
    pub ui: Option<String>,
    pub major_topic: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedIds {
    pub pmcid: Option<String>,
    pub doi: Option<String>,
}

/// Element whose text is being collected.
#[derive(Debug, Clone, Copy)]
enum Field {
    Pmid,
    Issn,
    JournalTitle,
    IsoAbbreviation,
    Volume,
    Issue,
    Year,
    ArticleTitle,
    PageRange,
    Abstract,
    LastName,
    ForeName,
    Initials,
    Affiliation,
    GrantId,
    Acronym,
    Agency,
    Country,
    RegistryNumber,
    SubstanceName,
    MeshTerm,
    Pmcid,
    Doi,
}

const ARTICLE: &str = "MedlineCitation/Article";

/// Parse a `PubmedArticleSet`, calling `on_article` for every
/// `<PubmedArticle>` that has a PMID. Other top-level records
/// (`<PubmedBookArticle>`, `<DeleteCitation>`) are skipped.
///
/// Single-valued fields keep their first occurrence. Text inside inline
/// markup (`<i>`, `<sup>`, ...) is accumulated into the enclosing field.
pub fn read_articles<R: BufRead>(
    reader: R,
    mut on_article: impl FnMut(PubMedArticle),
) -> Result<u64, PubMedError> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(false);

    let mut buf = Vec::with_capacity(4096);
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<PubMedArticle> = None;
    let mut reading: Option<(usize, Field)> = None;
    let mut text_buf = String::new();
    let mut emitted = 0u64;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                if stack.len() == 2 && stack[1] == "PubmedArticle" {
                    current = Some(PubMedArticle::default());
                } else if stack.len() > 2
                    && reading.is_none()
                    && let Some(doc) = current.as_mut()
                {
                    let path = stack[2..].join("/");
                    if let Some(field) = start_element(doc, &path, e, xml.decoder()) {
                        reading = Some((stack.len(), field));
                        text_buf.clear();
                    }
                }
            }

            Event::Text(ref e) => {
                if reading.is_some()
                    && let Ok(text) = e.unescape()
                {
                    text_buf.push_str(&text);
                }
            }

            Event::CData(ref e) => {
                if reading.is_some() {
                    text_buf.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }

            Event::End(_) => {
                if let Some((depth, field)) = reading
                    && depth == stack.len()
                {
                    reading = None;
                    if let Some(doc) = current.as_mut() {
                        assign(doc, field, text_buf.trim());
                    }
                }
                if stack.len() == 2
                    && stack[1] == "PubmedArticle"
                    && let Some(doc) = current.take()
                {
                    if doc.pmid.is_empty() {
                        tracing::debug!("skipping PubmedArticle without PMID");
                    } else {
                        emitted += 1;
                        on_article(doc);
                    }
                }
                stack.pop();
            }

            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(emitted)
}

/// Parse an efetch response into articles keyed by PMID. A PMID that
/// appears twice keeps its last record.
pub fn parse_articles(xml: &str) -> Result<BTreeMap<String, PubMedArticle>, PubMedError> {
    let mut articles = BTreeMap::new();
    read_articles(xml.as_bytes(), |article| {
        articles.insert(article.pmid.clone(), article);
    })?;
    Ok(articles)
}

/// Open list items and record attributes for the element at `path`
/// (relative to `<PubmedArticle>`), returning the field whose text it
/// carries, if any.
fn start_element(
    doc: &mut PubMedArticle,
    path: &str,
    e: &BytesStart<'_>,
    decoder: Decoder,
) -> Option<Field> {
    if path == "MedlineCitation/PMID" {
        return Some(Field::Pmid);
    }
    if path == "PubmedData/ArticleIdList/ArticleId" {
        return match attribute(e, b"IdType", decoder).as_deref() {
            Some("pmc") => Some(Field::Pmcid),
            Some("doi") => Some(Field::Doi),
            _ => None,
        };
    }
    if let Some(rest) = path.strip_prefix("MedlineCitation/ChemicalList/Chemical") {
        return match rest {
            "" => {
                doc.chemicals.push(Chemical::default());
                None
            }
            "/RegistryNumber" => Some(Field::RegistryNumber),
            "/NameOfSubstance" => Some(Field::SubstanceName),
            _ => None,
        };
    }
    if path == "MedlineCitation/MeshHeadingList/MeshHeading/DescriptorName" {
        doc.mesh.push(MeshDescriptor {
            term: None,
            ui: attribute(e, b"UI", decoder),
            major_topic: attribute(e, b"MajorTopicYN", decoder).as_deref() == Some("Y"),
        });
        return Some(Field::MeshTerm);
    }

    let rest = path.strip_prefix(ARTICLE)?;
    if rest.is_empty() {
        if doc.article.is_none() {
            doc.article = Some(Article {
                pub_model: attribute(e, b"PubModel", decoder),
                ..Article::default()
            });
        }
        return None;
    }
    let article = doc.article.as_mut()?;
    match rest {
        "/Journal/ISSN" => Some(Field::Issn),
        "/Journal/Title" => Some(Field::JournalTitle),
        "/Journal/ISOAbbreviation" => Some(Field::IsoAbbreviation),
        "/Journal/JournalIssue/Volume" => Some(Field::Volume),
        "/Journal/JournalIssue/Issue" => Some(Field::Issue),
        "/Journal/JournalIssue/PubDate/Year" => Some(Field::Year),
        "/ArticleTitle" => Some(Field::ArticleTitle),
        "/Pagination/MedlinePgn" => Some(Field::PageRange),
        "/Abstract/AbstractText" => Some(Field::Abstract),
        "/AuthorList/Author" => {
            article.authors.push(Author::default());
            None
        }
        "/AuthorList/Author/LastName" => Some(Field::LastName),
        "/AuthorList/Author/ForeName" => Some(Field::ForeName),
        "/AuthorList/Author/Initials" => Some(Field::Initials),
        "/AuthorList/Author/AffiliationInfo/Affiliation" => Some(Field::Affiliation),
        "/GrantList/Grant" => {
            article.grants.push(Grant::default());
            None
        }
        "/GrantList/Grant/GrantID" => Some(Field::GrantId),
        "/GrantList/Grant/Acronym" => Some(Field::Acronym),
        "/GrantList/Grant/Agency" => Some(Field::Agency),
        "/GrantList/Grant/Country" => Some(Field::Country),
        _ => None,
    }
}

fn assign(doc: &mut PubMedArticle, field: Field, text: &str) {
    if text.is_empty() {
        return;
    }
    match field {
        Field::Pmid => {
            if doc.pmid.is_empty() {
                doc.pmid = text.to_string();
            }
        }
        Field::Pmcid => set_first(&mut doc.related_ids.pmcid, text),
        Field::Doi => set_first(&mut doc.related_ids.doi, text),
        Field::RegistryNumber => {
            if let Some(chemical) = doc.chemicals.last_mut() {
                set_first(&mut chemical.registry_number, text);
            }
        }
        Field::SubstanceName => {
            if let Some(chemical) = doc.chemicals.last_mut() {
                set_first(&mut chemical.name, text);
            }
        }
        Field::MeshTerm => {
            if let Some(descriptor) = doc.mesh.last_mut() {
                set_first(&mut descriptor.term, text);
            }
        }
        _ => {
            if let Some(article) = doc.article.as_mut() {
                assign_article(article, field, text);
            }
        }
    }
}

fn assign_article(article: &mut Article, field: Field, text: &str) {
    let slot = match field {
        Field::Issn => &mut article.issn,
        Field::JournalTitle => &mut article.journal_title,
        Field::IsoAbbreviation => &mut article.journal_iso_abbreviation,
        Field::Volume => &mut article.volume,
        Field::Issue => &mut article.issue,
        Field::Year => &mut article.year,
        Field::ArticleTitle => &mut article.title,
        Field::PageRange => &mut article.page_range,
        Field::Abstract => &mut article.abstract_text,
        Field::LastName | Field::ForeName | Field::Initials | Field::Affiliation => {
            let Some(author) = article.authors.last_mut() else {
                return;
            };
            match field {
                Field::LastName => &mut author.last_name,
                Field::ForeName => &mut author.fore_name,
                Field::Initials => &mut author.initials,
                _ => {
                    author.affiliations.push(text.to_string());
                    return;
                }
            }
        }
        Field::GrantId | Field::Acronym | Field::Agency | Field::Country => {
            let Some(grant) = article.grants.last_mut() else {
                return;
            };
            match field {
                Field::GrantId => &mut grant.grant_id,
                Field::Acronym => &mut grant.acronym,
                Field::Agency => &mut grant.agency,
                _ => &mut grant.country,
            }
        }
        _ => return,
    };
    set_first(slot, text);
}

fn set_first(slot: &mut Option<String>, text: &str) {
    if slot.is_none() {
        *slot = Some(text.to_string());
    }
}

fn attribute(e: &BytesStart<'_>, name: &[u8], decoder: Decoder) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .map(|attr| match attr.decode_and_unescape_value(decoder) {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}
