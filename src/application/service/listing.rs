/// 一覧取得の結果
/// 「データが無い」ことをエラーや文字列比較ではなく型で区別する
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<T> {
    /// 該当なし
    Empty,
    /// 1件以上
    Items(Vec<T>),
}

impl<T> Listing<T> {
    /// ベクタから作成。空なら `Empty`
    pub fn from_vec(items: Vec<T>) -> Self {
        if items.is_empty() {
            Listing::Empty
        } else {
            Listing::Items(items)
        }
    }

    /// 該当なしか
    pub fn is_empty(&self) -> bool {
        matches!(self, Listing::Empty)
    }

    /// 要素をスライスとして取得
    pub fn items(&self) -> &[T] {
        match self {
            Listing::Empty => &[],
            Listing::Items(items) => items,
        }
    }
}
