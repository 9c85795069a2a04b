
use crate::data_types::collection::VariantCollection;
use crate::data_types::variant_record::VariantRecord;

/// Finds the best pairing candidate for a query variant.
///
/// The first pass is an exact-locus search (shared chromosome and position,
/// genotype and alleles ignored); this models "same site, different call".
/// When no locus match exists, a stricter pass requires exact REF and ALT
/// equality at the locus while still ignoring genotype content, which recovers
/// calls a genotype-aware matcher rejected purely over zygosity. Ties always
/// resolve to the first record in file order.
/// # Arguments
/// * `query` - the false call being paired
/// * `candidates` - the collection to search
pub fn find_closest<'a>(query: &VariantRecord, candidates: &'a VariantCollection) -> Option<&'a VariantRecord> {
    find_at_locus(query, candidates)
        .or_else(|| find_matching_alleles(query, candidates))
}

/// Locus-only search: first candidate sharing chromosome and position with the query.
/// # Arguments
/// * `query` - the false call being paired
/// * `candidates` - the collection to search
pub fn find_at_locus<'a>(query: &VariantRecord, candidates: &'a VariantCollection) -> Option<&'a VariantRecord> {
    candidates.records().iter()
        .find(|record| {
            record.chromosome() == query.chromosome()
                && record.position() == query.position()
        })
}

/// Allele-exact search: first candidate at the query locus whose REF and ALT
/// columns match exactly; genotype and other tail fields are not considered.
/// # Arguments
/// * `query` - the false call being paired
/// * `candidates` - the collection to search
pub fn find_matching_alleles<'a>(query: &VariantRecord, candidates: &'a VariantCollection) -> Option<&'a VariantRecord> {
    candidates.records().iter()
        .find(|record| {
            record.chromosome() == query.chromosome()
                && record.position() == query.position()
                && record.ref_allele() == query.ref_allele()
                && record.alt_alleles() == query.alt_alleles()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: &str) -> VariantRecord {
        VariantRecord::parse_line(line).unwrap()
    }

    fn candidates(records: Vec<VariantRecord>) -> VariantCollection {
        VariantCollection::new(vec![], records)
    }

    #[test]
    fn test_locus_match_ignores_genotype() {
        let query = record("chr1\t100\t.\tA\tT\t50\tPASS\t.\tGT\t0/1");
        let pool = candidates(vec![
            record("chr1\t100\t.\tA\tT\t50\tPASS\t.\tGT\t1/1")
        ]);
        let found = find_closest(&query, &pool).unwrap();
        assert_eq!(found.position(), 100);
    }

    #[test]
    fn test_no_match_at_locus() {
        let query = record("chr1\t100\t.\tA\tT\t50\tPASS\t.");
        let pool = candidates(vec![
            record("chr1\t200\t.\tA\tT\t50\tPASS\t."),
            record("chr2\t100\t.\tA\tT\t50\tPASS\t.")
        ]);
        assert!(find_closest(&query, &pool).is_none());
    }

    #[test]
    fn test_tie_break_first_in_file_order() {
        let query = record("chr1\t100\t.\tA\tT\t50\tPASS\t.");
        let pool = candidates(vec![
            record("chr1\t100\tfirst\tA\tG\t50\tPASS\t."),
            record("chr1\t100\tsecond\tA\tT\t50\tPASS\t.")
        ]);
        // the first locus match wins, even though the second has matching alleles
        let found = find_closest(&query, &pool).unwrap();
        assert_eq!(found.format_line(), "chr1\t100\tfirst\tA\tG\t50\tPASS\t.");
    }

    #[test]
    fn test_matching_alleles_requires_exact_ref_alt() {
        let query = record("chr1\t100\t.\tA\tT\t50\tPASS\t.\tGT\t0/0");
        let pool = candidates(vec![
            record("chr1\t100\t.\tA\tG\t50\tPASS\t.\tGT\t0/1"),
            record("chr1\t100\t.\tA\tT\t50\tPASS\t.\tGT\t0/1")
        ]);
        let found = find_matching_alleles(&query, &pool).unwrap();
        assert_eq!(found.alt_alleles(), "T");
        assert!(find_matching_alleles(&record("chr1\t100\t.\tA\tC\t50\tPASS\t."), &pool).is_none());
    }
}
