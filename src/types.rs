/// Stable external entity identifier (unique key in the entity store).
/// Examples: `Q17221213`, `Q928`
pub type EntityId = String;
/// Language code drawn from the fixed language table.
/// Examples: `en`, `tl`, `ceb`
pub type LangCode = String;
/// Bare media repository filename, percent-decoded.
/// Example: `Rizal Park historical marker.jpg`
pub type Filename = String;
/// Raw structured query text sent to the query endpoint.
/// Example: `SELECT ?marker ?coord WHERE { ... }`
pub type QueryText = String;
/// Output variable name declared by a query.
/// Examples: `marker`, `coord`, `titleNoValue`
pub type VarName = String;
/// One rendered part of an assembled address.
/// Examples: `Rizal Park`, `Manila`, `Metro Manila`
pub type AddressPart = String;
/// Raw wikitext of a discussion page.
/// Example: `{{LongInscription | langqid = Q1860 | inscription = ... }}`
pub type Wikitext = String;
