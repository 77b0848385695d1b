//! Composite identifiers for child resources without a native id

/// Separator between positional components
pub const COMPOSITE_ID_DELIMITER: char = ',';

/// Join ordered components into a single positional key
///
/// Empty components keep their slot, so arity stays fixed:
/// `["s1", "", "us-east-1"]` becomes `"s1,,us-east-1"`.
/// Components are not escaped; a component containing the delimiter can
/// make two distinct tuples collide.
pub fn composite_id<I, S>(components: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut id = String::new();
    for (idx, component) in components.into_iter().enumerate() {
        let component = component.as_ref();
        if idx > 0 {
            id.push(COMPOSITE_ID_DELIMITER);
        }
        if component.contains(COMPOSITE_ID_DELIMITER) {
            tracing::debug!("composite id component {:?} contains the delimiter", component);
        }
        id.push_str(component);
    }
    id
}
