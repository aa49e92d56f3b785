// Consumes the next token if its value matches one of the patterns.
//
// Returns the result for the matching pattern, or None if the next token doesn't match
// or the stream is exhausted. A token that doesn't match is left in the stream.
macro_rules! get_optional_element {
    ($stream :expr, $($pat:pat => $result:expr,)+) => {
        {
            let value = ($stream).peek()?.map(|token| token.value());
            match value {
                $(
                    Some($pat) => {
                        ($stream).consume()?;
                        Some($result)
                    },
                )+
                _ => None,
            }
        }
    };
}

