static DOCUMENT_SCHEMA_STR: &str =
    include_str!("../../../../schema/business-process-test.schema.json");

pub(crate) fn cmd_schema() {
    print!("{}", DOCUMENT_SCHEMA_STR);
}
