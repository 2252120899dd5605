pub(crate) trait StringExt {
    fn trim_in_place(&mut self);

    /// Guarantees the string ends with `/`, treating it as a directory-like prefix.
    fn ensure_trailing_slash(&mut self);
}

impl StringExt for String {
    fn trim_in_place(&mut self) {
        self.truncate(self.trim_end().len());

        let start = self.len() - self.trim_start().len();
        if start > 0 {
            self.drain(..start);
        }
    }

    fn ensure_trailing_slash(&mut self) {
        if !self.ends_with('/') {
            self.push('/');
        }
    }
}
