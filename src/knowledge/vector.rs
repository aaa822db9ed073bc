//! Vector Search - 정확한 최근접 이웃 검색
//!
//! 임베딩을 하나의 dense 행렬(row-major)로 저장하고
//! 제곱 유클리드 거리(squared L2)로 전수 검색합니다.

// ============================================================================
// Types
// ============================================================================

/// 문서 청크
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 청크 텍스트
    pub text: String,
    /// 문서 내 순서 (0-based)
    pub ordinal: usize,
}

/// 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// 청크 순서 (인덱스 행 번호와 동일)
    pub ordinal: usize,
    /// 제곱 L2 거리 (낮을수록 유사)
    pub distance: f32,
}

// ============================================================================
// FlatIndex
// ============================================================================

/// 전수 검색 인덱스 (FAISS IndexFlatL2와 같은 동작)
///
/// 빌드 후에는 변경되지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    dimension: usize,
    /// `len * dimension` 크기의 row-major 행렬
    data: Vec<f32>,
}

impl FlatIndex {
    /// 임베딩 행들로 인덱스 생성
    ///
    /// 모든 행의 차원이 같아야 합니다. 불일치 시 해당 행 번호를 돌려줍니다.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, usize> {
        let dimension = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * dimension);

        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != dimension || dimension == 0 {
                return Err(row_index);
            }
            data.extend_from_slice(row);
        }

        Ok(Self { dimension, data })
    }

    /// 저장된 벡터 수
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 벡터 차원
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// 거리 오름차순 상위 k개 (동점은 행 번호 순)
    ///
    /// 차원이 맞지 않는 쿼리는 빈 결과를 반환합니다.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<SearchResult> {
        if self.is_empty() || k == 0 || query.len() != self.dimension {
            return Vec::new();
        }

        let mut scored: Vec<SearchResult> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, row)| SearchResult {
                ordinal,
                distance: squared_l2(query, row),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.ordinal.cmp(&b.ordinal))
        });
        scored.truncate(k);
        scored
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 제곱 유클리드 거리
///
/// 길이가 다르면 짧은 쪽 길이까지만 계산합니다. 호출자가 차원을 맞춰야 합니다.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_l2_same() {
        let a = vec![1.0, 2.0, 3.0];
        assert_eq!(squared_l2(&a, &a), 0.0);
    }

    #[test]
    fn test_squared_l2_values() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((squared_l2(&a, &b) - 25.0).abs() < 0.0001);
    }

    #[test]
    fn test_from_rows_rejects_mismatched_dimension() {
        let rows = vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]];
        assert_eq!(FlatIndex::from_rows(&rows).err(), Some(1));
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = FlatIndex::default();
        assert!(index.is_empty());
        assert!(index.nearest(&[1.0, 0.0], 3).is_empty());
    }

    #[test]
    fn test_nearest_orders_by_distance() {
        let rows = vec![vec![10.0, 0.0], vec![1.0, 0.0], vec![5.0, 0.0]];
        let index = FlatIndex::from_rows(&rows).expect("consistent rows");

        let results = index.nearest(&[0.0, 0.0], 2);
        let ordinals: Vec<usize> = results.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2]);
        assert!((results[0].distance - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_nearest_ties_broken_by_ordinal() {
        let rows = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let index = FlatIndex::from_rows(&rows).expect("consistent rows");

        let results = index.nearest(&[0.0, 1.0], 3);
        let ordinals: Vec<usize> = results.iter().map(|r| r.ordinal).collect();
        assert_eq!(ordinals, vec![0, 2, 1]);
    }

    #[test]
    fn test_nearest_k_larger_than_index() {
        let rows = vec![vec![1.0], vec![2.0]];
        let index = FlatIndex::from_rows(&rows).expect("consistent rows");
        assert_eq!(index.nearest(&[0.0], 10).len(), 2);
    }

    #[test]
    fn test_nearest_wrong_query_dimension() {
        let rows = vec![vec![1.0, 2.0]];
        let index = FlatIndex::from_rows(&rows).expect("consistent rows");
        assert!(index.nearest(&[1.0], 1).is_empty());
    }
}
