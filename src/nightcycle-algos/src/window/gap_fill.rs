/// Fills every gap with the next recorded value.
///
/// Devices only emit a sample when a value changes and the sample describes the
/// interval leading up to it, so a gap takes the value recorded after it.
/// Slots after the last recorded value stay empty.
pub fn fill_gaps<T: Copy>(sparse: &[Option<T>]) -> Vec<Option<T>> {
    let mut next = None;
    let mut filled: Vec<Option<T>> = sparse
        .iter()
        .rev()
        .map(|value| {
            if value.is_some() {
                next = *value;
            }
            next
        })
        .collect();
    filled.reverse();
    filled
}
