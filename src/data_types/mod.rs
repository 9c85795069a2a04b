
/// Contains the variant collection snapshot and its file I/O
pub mod collection;
/// Contains the depth-field layouts used to derive allele fractions
pub mod depth_fields;
/// Contains the textual variant record model and its identity key
pub mod variant_record;
